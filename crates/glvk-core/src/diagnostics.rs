//! Validation messages raised while creating device objects.

use parking_lot::Mutex;
use tracing::warn;

use crate::reflect::ResourceCategory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A shader resource has no compatible binding in the pipeline layout.
    MissingBinding {
        name: String,
        category: ResourceCategory,
        set: u32,
        binding: u32,
    },
    /// A push-constant member lies outside every push-constant range of the layout.
    PushConstantOutOfRange { name: String, offset: u32, size: u32 },
}

/// The device's validation channel.
pub trait Diagnostics: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Reports diagnostics as `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::MissingBinding {
                name,
                category,
                set,
                binding,
            } => warn!(
                "shader {:?} '{}' has no binding in the pipeline layout (set={}, binding={})",
                category, name, set, binding
            ),
            Diagnostic::PushConstantOutOfRange { name, offset, size } => warn!(
                "push constant '{}' ({}+{}) is outside the layout's push constant ranges",
                name, offset, size
            ),
        }
    }
}

/// Keeps every diagnostic; used by tests and tools that inspect validation output.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }
}
