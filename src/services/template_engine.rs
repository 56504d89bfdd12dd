use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::models::{candidature::Candidature, profile::UserProfile};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{([^}]+)\}\}").expect("valid placeholder regex"))
}

/// Distinct placeholder names in `text`, in first-seen order.
pub fn extract(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(text) {
        let name = caps[1].trim();
        if name.is_empty() || names.iter().any(|n| n == name) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

/// Variables of a template are always derived from subject then body.
pub fn template_variables(subject: &str, body: &str) -> Vec<String> {
    extract(&format!("{} {}", subject, body))
}

/// Replaces each `{{name}}` with its binding, or nothing when unbound.
///
/// Single pass: a bound value that itself looks like a placeholder is
/// copied as-is and never expanded.
pub fn substitute(text: &str, bindings: &Bindings) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            bindings.get(caps[1].trim()).unwrap_or_default().to_string()
        })
        .into_owned()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The names templates can use when writing to a company contact.
    pub fn for_candidature(candidature: &Candidature, profile: &UserProfile) -> Self {
        Self::new()
            .with("entreprise", candidature.company.as_str())
            .with("contact_nom", candidature.contact_name.as_str())
            .with("poste", candidature.job_title.as_str())
            .with("nom", profile.last_name.as_str())
            .with("prenom", profile.first_name.as_str())
            .with("email", profile.email.as_str())
            .with("telephone", profile.phone.as_str())
            .with("adresse", profile.address.as_str())
    }
}
