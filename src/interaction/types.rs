//! Interaction wire shapes and classification
//!
//! Only the fields needed to classify and route an interaction are modelled.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interaction type codes as sent by the platform
pub mod codes {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;
    pub const MESSAGE_COMPONENT: u8 = 3;
    pub const AUTOCOMPLETE: u8 = 4;
    pub const MODAL_SUBMIT: u8 = 5;
}

/// Interacting user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw interaction as received from the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInteraction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    /// Tenant the interaction happened in; absent for direct messages
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub user: Option<InteractionUser>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A named command option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    /// Set on the option being typed during autocomplete
    #[serde(default)]
    pub focused: bool,
    /// Nested options of a subcommand
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    /// Subcommands carry nested options instead of a value
    pub fn is_subcommand(&self) -> bool {
        self.value.is_null()
    }

    /// String value; numbers and booleans are stringified
    pub fn value_str(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn option_value(name: impl Into<String>, value: impl Into<Value>) -> CommandOption {
    CommandOption {
        name: name.into(),
        value: value.into(),
        focused: false,
        options: Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct CommandData {
    name: String,
    #[serde(default)]
    options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
struct ComponentData {
    custom_id: String,
    #[serde(default)]
    values: Vec<String>,
}

/// Fields shared by every classified interaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionMeta {
    pub id: String,
    pub tenant_id: Option<String>,
    pub channel_id: Option<String>,
    pub user: Option<InteractionUser>,
}

impl From<&RawInteraction> for InteractionMeta {
    fn from(raw: &RawInteraction) -> Self {
        Self {
            id: raw.id.clone(),
            tenant_id: raw.guild_id.clone(),
            channel_id: raw.channel_id.clone(),
            user: raw.user.clone(),
        }
    }
}

/// Command invocation or autocomplete request
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInteraction {
    pub meta: InteractionMeta,
    pub name: String,
    pub options: Vec<CommandOption>,
}

impl CommandInteraction {
    pub fn new(meta: InteractionMeta, name: impl Into<String>) -> Self {
        Self {
            meta,
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.push(option_value(name, value));
        self
    }

    /// Add a subcommand with its options
    pub fn with_subcommand<N, V>(mut self, name: &str, options: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        self.options.push(CommandOption {
            name: name.to_string(),
            value: Value::Null,
            focused: false,
            options: options
                .into_iter()
                .map(|(n, v)| option_value(n, v))
                .collect(),
        });
        self
    }

    /// Mark an option (top level or inside a subcommand) as focused
    pub fn with_focus(mut self, name: &str) -> Self {
        for option in self.options.iter_mut() {
            if option.name == name && !option.is_subcommand() {
                option.focused = true;
            }
            for nested in option.options.iter_mut().filter(|o| o.name == name) {
                nested.focused = true;
            }
        }
        self
    }

    /// The invoked subcommand, if any
    pub fn subcommand(&self) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.is_subcommand())
    }

    /// Option value by name, looking inside the subcommand too
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.all_options()
            .find(|o| o.name == name && !o.is_subcommand())
            .map(|o| &o.value)
    }

    /// String option value by name
    pub fn option_str(&self, name: &str) -> Option<String> {
        self.all_options()
            .find(|o| o.name == name && !o.is_subcommand())
            .and_then(CommandOption::value_str)
    }

    /// The option being typed, for autocomplete requests
    pub fn focused(&self) -> Option<&CommandOption> {
        self.all_options().find(|o| o.focused)
    }

    fn all_options(&self) -> impl Iterator<Item = &CommandOption> {
        self.options
            .iter()
            .flat_map(|o| std::iter::once(o).chain(o.options.iter()))
    }
}

/// Button or select-menu interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInteraction {
    pub meta: InteractionMeta,
    pub custom_id: String,
    pub values: Vec<String>,
}

impl ComponentInteraction {
    /// The registry key: the part of the custom id before the first `:`
    pub fn route_key(&self) -> &str {
        self.custom_id
            .split_once(':')
            .map_or(self.custom_id.as_str(), |(head, _)| head)
    }
}

/// A classified interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Command(CommandInteraction),
    Autocomplete(CommandInteraction),
    Component(ComponentInteraction),
}

impl Interaction {
    /// Classify a raw interaction. Unsupported kinds or missing data yield `None`.
    pub fn classify(raw: &RawInteraction) -> Option<Self> {
        let meta = InteractionMeta::from(raw);
        let data = raw.data.clone()?;
        match raw.kind {
            codes::APPLICATION_COMMAND | codes::AUTOCOMPLETE => {
                let data: CommandData = serde_json::from_value(data).ok()?;
                let command = CommandInteraction {
                    meta,
                    name: data.name,
                    options: data.options,
                };
                if raw.kind == codes::AUTOCOMPLETE {
                    Some(Interaction::Autocomplete(command))
                } else {
                    Some(Interaction::Command(command))
                }
            }
            codes::MESSAGE_COMPONENT => {
                let data: ComponentData = serde_json::from_value(data).ok()?;
                Some(Interaction::Component(ComponentInteraction {
                    meta,
                    custom_id: data.custom_id,
                    values: data.values,
                }))
            }
            _ => None,
        }
    }

    pub fn meta(&self) -> &InteractionMeta {
        match self {
            Interaction::Command(c) | Interaction::Autocomplete(c) => &c.meta,
            Interaction::Component(c) => &c.meta,
        }
    }

    /// Handler identifier: command name or component custom id
    pub fn target(&self) -> &str {
        match self {
            Interaction::Command(c) | Interaction::Autocomplete(c) => &c.name,
            Interaction::Component(c) => &c.custom_id,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Interaction::Command(_) => "command",
            Interaction::Autocomplete(_) => "autocomplete",
            Interaction::Component(_) => "component",
        }
    }
}
