//! Formatter configuration.
//!
//! Supports both programmatic configuration and environment variable
//! overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ITS_VALIDATE_CONFORMANCE` | true | Run the conformance validator |
//! | `ITS_AUTO_SYNTHESIZE_NULLS` | true | Send `nullFlavor="NI"` for missing required values |
//! | `ITS_WRAPPER_ELEMENT` | instance | Root element for non entry-point types |
//! | `ITS_PRETTY_PRINT` | false | Indent output |
//! | `ITS_WRITE_DECLARATION` | true | Start output with an XML declaration |
//!
//! # Example
//!
//! ```rust
//! use helios_its_serde::FormatterConfig;
//!
//! // Create from environment
//! let config = FormatterConfig::from_env();
//!
//! // Or create programmatically
//! let config = FormatterConfig {
//!     pretty_print: true,
//!     wrapper_element: "payload".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use clap::Parser;

use crate::xml::utils;

/// Formatter configuration.
///
/// Can be constructed from environment variables using
/// [`FormatterConfig::from_env`], from command line arguments using
/// [`FormatterConfig::parse`], or programmatically.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "its-formatter")]
#[command(about = "HL7v3 XML ITS 1.0 formatter settings")]
pub struct FormatterConfig {
    /// Run the conformance validator on every instance.
    #[arg(long, env = "ITS_VALIDATE_CONFORMANCE", default_value = "true")]
    pub validate_conformance: bool,

    /// Send missing required element and association values as nullFlavor="NI".
    #[arg(long, env = "ITS_AUTO_SYNTHESIZE_NULLS", default_value = "true")]
    pub auto_synthesize_nulls: bool,

    /// Root element wrapping types that are not entry points.
    #[arg(long, env = "ITS_WRAPPER_ELEMENT", default_value = "instance")]
    pub wrapper_element: String,

    /// Indent nested elements.
    #[arg(long, env = "ITS_PRETTY_PRINT", default_value = "false")]
    pub pretty_print: bool,

    /// Start output with an XML declaration.
    #[arg(long, env = "ITS_WRITE_DECLARATION", default_value = "true")]
    pub write_declaration: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            validate_conformance: true,
            auto_synthesize_nulls: true,
            wrapper_element: "instance".to_string(),
            pretty_print: false,
            write_declaration: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a new FormatterConfig from environment variables.
    ///
    /// Command line arguments of the host process are ignored.
    pub fn from_env() -> Self {
        Self::try_parse_from(["its-formatter"]).unwrap_or_default()
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.wrapper_element.is_empty() {
            errors.push("Wrapper element cannot be empty".to_string());
        } else if !utils::is_ncname(&self.wrapper_element) {
            errors.push(format!(
                "Wrapper element '{}' is not a valid XML name",
                self.wrapper_element
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Output is compact and has no XML declaration, which keeps expected
    /// documents short.
    pub fn for_testing() -> Self {
        Self {
            validate_conformance: true,
            auto_synthesize_nulls: true,
            wrapper_element: "instance".to_string(),
            pretty_print: false,
            write_declaration: false,
        }
    }
}
