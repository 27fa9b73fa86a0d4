use anyhow::Context;
use glvk_protocol::{CmdBuffer, Command, Decoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DumpFormat {
    /// One line per record: word offset, kind, fields
    Text,
    /// Array of records tagged with their kind
    Json,
}

/// Decode every record with the word offset of its header.
pub fn decode(stream: &CmdBuffer) -> anyhow::Result<Vec<(usize, Command)>> {
    let mut decoder = Decoder::new(stream.words());
    let mut records = Vec::new();
    loop {
        let offset = decoder.position();
        match decoder
            .next_command()
            .with_context(|| format!("decoding record at word {}", offset))?
        {
            Some(command) => records.push((offset, command)),
            None => break,
        }
    }
    Ok(records)
}

pub fn dump(stream: &CmdBuffer, format: DumpFormat) -> anyhow::Result<String> {
    let records = decode(stream)?;
    match format {
        DumpFormat::Json => {
            let commands: Vec<&Command> = records.iter().map(|(_, c)| c).collect();
            Ok(serde_json::to_string_pretty(&commands)?)
        }
        DumpFormat::Text => {
            let mut out = String::new();
            for (offset, command) in &records {
                let mut fields = serde_json::to_value(command)?;
                if let Some(object) = fields.as_object_mut() {
                    object.remove("op");
                }
                out.push_str(&format!(
                    "{:>6}  {:<20} {}\n",
                    offset,
                    command.kind().name(),
                    fields
                ));
            }
            Ok(out)
        }
    }
}
