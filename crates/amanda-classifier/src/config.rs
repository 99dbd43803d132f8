//! Configuration for the Classifier

use amanda_domain::PriorityTable;
use serde::{Deserialize, Serialize};

use crate::rules::DEFAULT_MAX_LAYOUT_BUTTONS;

/// Domain priorities as they appear in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySettings {
    /// Priority of digital elements
    #[serde(default = "default_digital")]
    pub digital: u8,
    /// Priority of physical elements
    #[serde(default = "default_physical")]
    pub physical: u8,
    /// Priority of constitutional elements
    #[serde(default = "default_constitutional")]
    pub constitutional: u8,
}

fn default_digital() -> u8 {
    PriorityTable::default().digital
}

fn default_physical() -> u8 {
    PriorityTable::default().physical
}

fn default_constitutional() -> u8 {
    PriorityTable::default().constitutional
}

impl Default for PrioritySettings {
    fn default() -> Self {
        PriorityTable::default().into()
    }
}

impl From<PriorityTable> for PrioritySettings {
    fn from(table: PriorityTable) -> Self {
        Self {
            digital: table.digital,
            physical: table.physical,
            constitutional: table.constitutional,
        }
    }
}

impl From<PrioritySettings> for PriorityTable {
    fn from(settings: PrioritySettings) -> Self {
        Self {
            digital: settings.digital,
            physical: settings.physical,
            constitutional: settings.constitutional,
        }
    }
}

/// Which built-in rule sets are registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSets {
    /// Pre-classified `element` records, every domain
    #[serde(default = "enabled")]
    pub declared: bool,
    /// Touch-screen `layout` records
    #[serde(default = "enabled")]
    pub layout: bool,
    /// `source_line` records matched against code patterns
    #[serde(default = "enabled")]
    pub code: bool,
    /// Physical `structure` records
    #[serde(default = "enabled")]
    pub blueprint: bool,
    /// Network `route` and `firewall` records
    #[serde(default = "enabled")]
    pub network: bool,
    /// Constitutional `statute` records
    #[serde(default = "enabled")]
    pub statute: bool,
}

fn enabled() -> bool {
    true
}

impl Default for RuleSets {
    fn default() -> Self {
        Self {
            declared: true,
            layout: true,
            code: true,
            blueprint: true,
            network: true,
            statute: true,
        }
    }
}

/// Configuration for the Classifier
///
/// # Examples
///
/// ```
/// use amanda_classifier::ClassifierConfig;
///
/// let config: ClassifierConfig = toml::from_str(r#"
///     max_layout_buttons = 32
///
///     [priorities]
///     constitutional = 5
///
///     [rule_sets]
///     code = false
/// "#).unwrap();
///
/// assert!(!config.rule_sets.code);
/// assert!(config.rule_sets.layout);
/// assert_eq!(config.max_layout_buttons, 32);
/// assert_eq!(config.priority_table().constitutional, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Priority of each domain, tagged onto every element
    #[serde(default)]
    pub priorities: PrioritySettings,

    /// Built-in rule sets to register
    #[serde(default)]
    pub rule_sets: RuleSets,

    /// Largest button count a touch-screen layout may declare
    #[serde(default = "default_max_layout_buttons")]
    pub max_layout_buttons: u32,
}

fn default_max_layout_buttons() -> u32 {
    DEFAULT_MAX_LAYOUT_BUTTONS
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            priorities: PrioritySettings::default(),
            rule_sets: RuleSets::default(),
            max_layout_buttons: DEFAULT_MAX_LAYOUT_BUTTONS,
        }
    }
}

impl ClassifierConfig {
    /// Only pre-classified `element` records are accepted
    pub fn declared_only() -> Self {
        Self {
            rule_sets: RuleSets {
                declared: true,
                layout: false,
                code: false,
                blueprint: false,
                network: false,
                statute: false,
            },
            ..Default::default()
        }
    }

    /// The priority table in domain form
    pub fn priority_table(&self) -> PriorityTable {
        self.priorities.into()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_layout_buttons == 0 {
            return Err("max_layout_buttons must be at least 1".to_string());
        }
        self.priority_table().validate()
    }
}
