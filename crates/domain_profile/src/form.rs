//! Profile editor
//!
//! The admin-facing form contract for creating and editing profiles. The
//! editor resolves which profile is being edited, describes the fields with
//! live option lists from the CRM, and writes submitted values back through
//! the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::ProfileError;
use crate::ports::{OptionItem, ReferenceDataPort};
use crate::profile::{Profile, ProfileAttribute, DEFAULT_PROFILE_NAME};
use crate::registry::ProfileRegistry;

const NEW_PROFILE_TITLE: &str = "New betterplace.org Direkt API profile";
const EDIT_PROFILE_TITLE: &str = "Edit betterplace.org Direkt API profile";

/// How a form field is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Read-only text
    Static,
    Text,
    Select,
    MultiSelect,
}

/// One field of the profile editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionItem>,
}

impl FormField {
    fn new(name: &str, label: &str, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required,
            options: Vec::new(),
        }
    }

    fn with_options(mut self, options: Vec<OptionItem>) -> Self {
        self.options = options;
        self
    }
}

/// Complete description of the editor for one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub title: String,
    pub fields: Vec<FormField>,
    /// Current values, keyed by field name
    pub defaults: BTreeMap<String, Value>,
}

impl FormDefinition {
    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Editor session for a single profile
#[derive(Debug)]
pub struct ProfileForm<'a> {
    registry: &'a ProfileRegistry,
    profile: Profile,
    /// Name the profile is stored under, `None` for a new profile
    stored_name: Option<String>,
}

impl<'a> ProfileForm<'a> {
    /// Resolves the profile to edit
    ///
    /// With a name, that profile is edited. Without one, `new` asks for a blank
    /// profile and otherwise the default profile is edited. A name that does
    /// not exist also yields a blank profile.
    #[instrument(skip(registry))]
    pub async fn open(
        registry: &'a ProfileRegistry,
        name: Option<&str>,
        new: bool,
    ) -> Result<ProfileForm<'a>, ProfileError> {
        let name = match name.filter(|n| !n.is_empty()) {
            Some(name) => Some(name),
            None if new => None,
            None => Some(DEFAULT_PROFILE_NAME),
        };

        let existing = match name {
            Some(name) => registry.profile(name).await?,
            None => None,
        };

        let form = match existing {
            Some(profile) => Self {
                registry,
                stored_name: Some(profile.name().to_string()),
                profile,
            },
            None => Self {
                registry,
                profile: Profile::new(""),
                stored_name: None,
            },
        };
        debug!(is_new = form.is_new(), "Opened profile editor");
        Ok(form)
    }

    /// Returns true when the editor creates a new profile
    pub fn is_new(&self) -> bool {
        self.stored_name.is_none()
    }

    /// The profile as currently held by the editor
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn title(&self) -> String {
        match &self.stored_name {
            Some(name) => format!("{} {}", EDIT_PROFILE_TITLE, name),
            None => NEW_PROFILE_TITLE.to_string(),
        }
    }

    fn edits_default(&self) -> bool {
        self.stored_name.as_deref() == Some(DEFAULT_PROFILE_NAME)
    }

    /// Describes the editor's fields with options fetched from the CRM
    pub async fn build(
        &self,
        reference: &dyn ReferenceDataPort,
    ) -> Result<FormDefinition, ProfileError> {
        let name_kind = if self.edits_default() {
            FieldKind::Static
        } else {
            FieldKind::Text
        };

        let mut campaigns = vec![OptionItem::new("", "no campaign")];
        campaigns.extend(reference.campaigns().await?);

        let payment_instruments = reference.payment_instruments().await?;

        let mut groups = reference.mailing_list_groups().await?;
        if groups.is_empty() {
            groups.push(OptionItem::new("", "No mailing lists available"));
        }

        let fields = vec![
            FormField::new("name", "Profile name", name_kind, !self.edits_default()),
            FormField::new("selector", "Form IDs", FieldKind::Text, true),
            FormField::new("location_type_id", "Location type", FieldKind::Select, true)
                .with_options(reference.location_types().await?),
            FormField::new("financial_type_id", "Financial Type", FieldKind::Select, true)
                .with_options(reference.financial_types().await?),
            FormField::new("campaign_id", "Campaign", FieldKind::Select, false)
                .with_options(campaigns),
            FormField::new("pi_creditcard", "Record CreditCard as", FieldKind::Select, true)
                .with_options(payment_instruments.clone()),
            FormField::new("pi_paypal", "Record PayPal as", FieldKind::Select, true)
                .with_options(payment_instruments.clone()),
            FormField::new("pi_sepa", "Record SEPA direct debit as", FieldKind::Select, true)
                .with_options(payment_instruments),
            FormField::new("groups", "Sign up for groups", FieldKind::MultiSelect, false)
                .with_options(groups),
        ];

        let mut defaults = BTreeMap::new();
        defaults.insert("name".to_string(), Value::String(self.profile.name().to_string()));
        for attribute in ProfileAttribute::ALL {
            defaults.insert(attribute.as_str().to_string(), self.profile.attribute(attribute));
        }

        Ok(FormDefinition {
            title: self.title(),
            fields,
            defaults,
        })
    }

    /// Applies submitted values and saves the profile
    ///
    /// Keys that are not profile attributes (and `name`) are ignored. The
    /// default profile keeps its name whatever was submitted.
    #[instrument(skip(self, values))]
    pub async fn submit(mut self, values: &Map<String, Value>) -> Result<Profile, ProfileError> {
        let mut profile = self.profile.clone();

        if !self.edits_default() {
            if let Some(name) = values.get("name") {
                let name = match name {
                    Value::String(s) => s.trim().to_string(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                profile.set_name(name);
            }
        }

        for attribute in ProfileAttribute::ALL {
            if let Some(value) = values.get(attribute.as_str()) {
                profile.set_attribute(attribute, value)?;
            }
        }

        match self.stored_name.as_deref() {
            Some(previous) => self.registry.save_replacing(profile.clone(), previous).await?,
            None => self.registry.create(profile.clone()).await?,
        }

        self.stored_name = Some(profile.name().to_string());
        self.profile = profile.clone();
        Ok(profile)
    }
}
