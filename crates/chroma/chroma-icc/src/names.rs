/// Namespace used when no other is configured.
pub const DEFAULT_NAMESPACE: &str = "graph_coloring";

/// The four system-wide names shared by a supervisor and its generators.
///
/// Every participant derives them from the same namespace prefix, so a
/// supervisor started with `--namespace foo` only talks to generators
/// started with the same prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub region: String,
    pub free_slots: String,
    pub used_slots: String,
    pub write_mutex: String,
}

impl ResourceNames {
    pub fn with_namespace(namespace: &str) -> Self {
        let ns = namespace.trim_start_matches('/');
        Self {
            region: format!("/{ns}_shm"),
            free_slots: format!("/{ns}_sem_free"),
            used_slots: format!("/{ns}_sem_used"),
            write_mutex: format!("/{ns}_sem_mutex"),
        }
    }

    pub fn semaphores(&self) -> [&str; 3] {
        [&self.free_slots, &self.used_slots, &self.write_mutex]
    }
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }
}
