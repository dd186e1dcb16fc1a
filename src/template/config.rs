//! Configuration for synthesis and template output

/// Configuration options for synthesis
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Whether to format output with indentation
    pub pretty_print: bool,

    /// Log the construct tree and every assigned logical id
    pub debug: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            pretty_print: true,
            debug: false,
        }
    }
}

impl SynthConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to pretty-print output
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// Enable or disable debug logging of the tree
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
