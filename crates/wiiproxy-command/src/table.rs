use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::trace;

use crate::descriptor::Descriptor;
use crate::error::{CommandError, Result};
use crate::layout::Layout;
use crate::record::MspRecord;

/// Collects descriptors before the table is frozen.
///
/// Every registration is checked as it happens: an out-of-range code, a
/// code that is already taken or a name that is already taken fails
/// immediately and leaves the builder unchanged.
#[derive(Debug, Default)]
pub struct CommandTableBuilder {
    by_code: BTreeMap<u8, Arc<Descriptor>>,
    by_name: HashMap<String, u8>,
}

impl CommandTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unnamed command. It is named `CMD_<code>`.
    pub fn register(&mut self, code: u8, layout: Layout) -> Result<Arc<Descriptor>> {
        self.register_named(&format!("CMD_{code}"), code, layout)
    }

    /// Register a command under a name.
    pub fn register_named(
        &mut self,
        name: &str,
        code: u8,
        layout: Layout,
    ) -> Result<Arc<Descriptor>> {
        let name = normalize(name);
        let descriptor = Descriptor::new(code, name.clone(), layout)?;

        if self.by_code.contains_key(&code) {
            return Err(CommandError::DuplicateRegistration { code });
        }
        if self.by_name.contains_key(&name) {
            return Err(CommandError::DuplicateName { name });
        }

        trace!(code, %name, layout = %descriptor.layout(), "registered command");
        let descriptor = Arc::new(descriptor);
        self.by_name.insert(name, code);
        self.by_code.insert(code, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Register a command whose layout is given as a format string.
    pub fn register_format(
        &mut self,
        name: &str,
        code: u8,
        format: &str,
    ) -> Result<Arc<Descriptor>> {
        let layout = format.parse()?;
        self.register_named(name, code, layout)
    }

    /// Register the command a typed record describes.
    pub fn register_record<R: MspRecord>(&mut self) -> Result<Arc<Descriptor>> {
        self.register_named(R::NAME, R::CODE, R::layout())
    }

    /// Freeze the table.
    pub fn build(self) -> CommandTable {
        CommandTable {
            by_code: self.by_code,
            by_name: self.by_name,
        }
    }
}

/// Immutable code → descriptor mapping.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    by_code: BTreeMap<u8, Arc<Descriptor>>,
    by_name: HashMap<String, u8>,
}

impl CommandTable {
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::new()
    }

    /// Look up the descriptor for `code`.
    pub fn lookup(&self, code: u8) -> Result<Arc<Descriptor>> {
        self.by_code
            .get(&code)
            .cloned()
            .ok_or(CommandError::NotRegistered { code })
    }

    /// Find a command by decimal code or by name.
    ///
    /// Names are case-insensitive and may carry the `MSP_` prefix, so
    /// `attitude`, `ATTITUDE`, `msp_attitude` and `108` all match.
    pub fn find(&self, query: &str) -> Option<Arc<Descriptor>> {
        let query = query.trim();
        if let Ok(code) = query.parse::<u8>() {
            return self.by_code.get(&code).cloned();
        }
        let code = self.by_name.get(&normalize(query))?;
        self.by_code.get(code).cloned()
    }

    pub fn contains(&self, code: u8) -> bool {
        self.by_code.contains_key(&code)
    }

    /// Descriptors in code order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.by_code.values()
    }

    /// Registered codes in ascending order.
    pub fn codes(&self) -> Vec<u8> {
        self.by_code.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

fn normalize(name: &str) -> String {
    let upper = name.trim().to_ascii_uppercase();
    match upper.strip_prefix("MSP_") {
        Some(rest) => rest.to_string(),
        None => upper,
    }
}
