//! # Meta-Command Table
//!
//! Shell-local directives that never reach the backend as statements.
//! Every profile shares the control words and contributes its own aliases
//! for entity listing and cluster description.
//!
//! ## Shared Commands
//!
//! | Command                          | Action                     |
//! |----------------------------------|----------------------------|
//! | `help`, `\h`, `\help`            | Show the command reference |
//! | `exit`, `quit`, `\q`, `\quit`, `\exit` | Leave the shell      |
//! | `clear`, `\c`, `\clear`          | Clear the terminal         |
//!
//! ## Parsing
//!
//! Matching is case-insensitive against the whole trimmed line. A line that
//! starts with a backslash but matches nothing is still a meta-command:
//! [`MetaCommand::Unknown`], reported without contacting the backend.

use crate::backend::{ClusterAspect, Profile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Quit,
    Clear,
    ListEntities,
    Cluster(ClusterAspect),
    Unknown(String),
}

const HELP_ALIASES: &[&str] = &["help", "\\h", "\\help"];
const QUIT_ALIASES: &[&str] = &["exit", "quit", "\\q", "\\quit", "\\exit"];
const CLEAR_ALIASES: &[&str] = &["clear", "\\c", "\\clear"];

#[derive(Debug, Clone)]
pub struct MetaTable {
    entries: Vec<(String, MetaCommand)>,
}

impl MetaTable {
    pub fn for_profile(profile: &Profile) -> Self {
        let groups: [(&[&str], MetaCommand); 6] = [
            (HELP_ALIASES, MetaCommand::Help),
            (QUIT_ALIASES, MetaCommand::Quit),
            (CLEAR_ALIASES, MetaCommand::Clear),
            (profile.entity_aliases, MetaCommand::ListEntities),
            (profile.info_aliases, MetaCommand::Cluster(ClusterAspect::Info)),
            (profile.health_aliases, MetaCommand::Cluster(ClusterAspect::Health)),
        ];

        let mut entries = Vec::new();
        for (aliases, command) in groups {
            for alias in aliases {
                entries.push((alias.to_lowercase(), command.clone()));
            }
        }

        Self { entries }
    }

    /// Resolves a trimmed line to a meta-command, if it is one.
    pub fn lookup(&self, line: &str) -> Option<MetaCommand> {
        let token = line.trim().to_lowercase();

        if let Some((_, command)) = self.entries.iter().find(|(alias, _)| *alias == token) {
            return Some(command.clone());
        }

        token
            .starts_with('\\')
            .then(|| MetaCommand::Unknown(line.trim().to_string()))
    }
}

/// Command reference for a profile: shared commands, then the backend's
/// statement examples.
pub fn help_text(profile: &Profile) -> String {
    let noun = plural(profile.entity_noun);
    let rows = [
        (HELP_ALIASES, "Show this help".to_string()),
        (profile.entity_aliases, format!("List {}", noun)),
        (profile.info_aliases, "Show cluster information".to_string()),
        (profile.health_aliases, "Show cluster health".to_string()),
        (CLEAR_ALIASES, "Clear screen".to_string()),
        (QUIT_ALIASES, "Exit the CLI".to_string()),
    ];

    let mut text = String::from("\n📚 Available Commands:\n");
    for (aliases, description) in rows {
        text.push_str(&format!("  {:<28} - {}\n", aliases.join(", "), description));
    }

    if !profile.statement_help.is_empty() {
        text.push('\n');
        text.push_str(&profile.statement_help);
        text.push('\n');
    }

    text
}

pub fn plural(noun: &str) -> String {
    if noun.ends_with('x') || noun.ends_with('s') {
        format!("{}es", noun)
    } else {
        format!("{}s", noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::elasticsearch::{Elasticsearch, ElasticsearchConfig};
    use crate::backend::Backend;

    fn table() -> (MetaTable, Profile) {
        let backend = Elasticsearch::new(ElasticsearchConfig::from_lookup(|_| None));
        let profile = backend.profile().clone();
        (MetaTable::for_profile(&profile), profile)
    }

    #[test]
    fn quit_commands_resolve_to_quit() {
        let (meta, _) = table();
        for token in ["exit", "quit", "\\q", "QUIT", "  Exit  "] {
            assert_eq!(meta.lookup(token), Some(MetaCommand::Quit), "{}", token);
        }
    }

    #[test]
    fn profile_aliases_are_recognized() {
        let (meta, _) = table();
        assert_eq!(meta.lookup("\\indices"), Some(MetaCommand::ListEntities));
        assert_eq!(meta.lookup("\\l"), Some(MetaCommand::ListEntities));
        assert_eq!(meta.lookup("\\i"), Some(MetaCommand::Cluster(ClusterAspect::Info)));
        assert_eq!(meta.lookup("health"), Some(MetaCommand::Cluster(ClusterAspect::Health)));
    }

    #[test]
    fn statements_are_not_commands() {
        let (meta, _) = table();
        assert_eq!(meta.lookup("GET /_cat/indices;"), None);
        assert_eq!(meta.lookup("help me"), None);
        assert_eq!(meta.lookup(""), None);
    }

    #[test]
    fn unknown_backslash_token_is_reported() {
        let (meta, _) = table();
        assert_eq!(meta.lookup("\\zz"), Some(MetaCommand::Unknown("\\zz".into())));
    }

    #[test]
    fn help_lists_aliases_and_statement_examples() {
        let (_, profile) = table();
        let text = help_text(&profile);
        assert!(text.contains("help, \\h, \\help"));
        assert!(text.contains("List indexes"));
        assert!(text.contains("exit, quit, \\q"));
        assert!(text.contains("GET /_cat/indices;"));
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural("index"), "indexes");
        assert_eq!(plural("table"), "tables");
        assert_eq!(plural("collection"), "collections");
    }
}
