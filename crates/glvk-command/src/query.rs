//! Queries and events.

use std::sync::Arc;

use ash::vk;
use glvk_core::resource::{Event, QueryPool};
use glvk_protocol::records::{BeginQuery, EndQuery, ResetEvent, ResetQuery, SetEvent, WriteTimestamp};
use glvk_protocol::CmdBuffer;

use crate::buffer::CommandBuffer;
use crate::error::CommandError;

fn query_name(pool: &QueryPool, query: u32) -> Result<u32, CommandError> {
    pool.name(query).ok_or_else(|| {
        CommandError::InvalidArgument(format!(
            "query {} of a pool with {} queries",
            query,
            pool.names.len()
        ))
    })
}

impl CommandBuffer {
    pub fn reset_query_pool(
        &mut self,
        pool: &Arc<QueryPool>,
        first: u32,
        count: u32,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let end = first.checked_add(count).ok_or_else(|| {
            CommandError::InvalidArgument(format!("queries {}+{} overflow", first, count))
        })?;
        let mut out = CmdBuffer::new();
        for query in first..end {
            out.push(ResetQuery {
                query: query_name(pool, query)?,
                ..Default::default()
            });
        }
        self.main.push(out);
        Ok(())
    }

    pub fn begin_query(
        &mut self,
        pool: &Arc<QueryPool>,
        query: u32,
        flags: vk::QueryControlFlags,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let name = query_name(pool, query)?;
        let key = (pool.handle.id, query);
        if self.rec.queries.contains_key(&key) {
            return Err(CommandError::InvalidArgument(format!(
                "query {} is already active",
                query
            )));
        }
        let target = pool.target(flags.contains(vk::QueryControlFlags::PRECISE));
        self.rec.queries.insert(key, target);
        self.main.push_record(BeginQuery {
            target,
            query: name,
        });
        Ok(())
    }

    pub fn end_query(&mut self, pool: &Arc<QueryPool>, query: u32) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let target = self
            .rec
            .queries
            .remove(&(pool.handle.id, query))
            .ok_or_else(|| CommandError::InvalidArgument(format!("query {} is not active", query)))?;
        self.main.push_record(EndQuery {
            target,
            ..Default::default()
        });
        Ok(())
    }

    pub fn write_timestamp(
        &mut self,
        _stage: vk::PipelineStageFlags,
        pool: &Arc<QueryPool>,
        query: u32,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let name = query_name(pool, query)?;
        self.main.push_record(WriteTimestamp {
            query: name,
            ..Default::default()
        });
        Ok(())
    }

    pub fn set_event(
        &mut self,
        event: &Arc<Event>,
        _stage: vk::PipelineStageFlags,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let id = self.resources.add_event(event.clone());
        self.main.push_record(SetEvent { event: id });
        Ok(())
    }

    pub fn reset_event(
        &mut self,
        event: &Arc<Event>,
        _stage: vk::PipelineStageFlags,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let id = self.resources.add_event(event.clone());
        self.main.push_record(ResetEvent { event: id });
        Ok(())
    }
}
