// src/prompt.rs

//! Interactive prompts
//!
//! Choices are offered with their shortest unique prefix as an alias, e.g.
//! `[b]ackup, [o]verwrite, [s]kip, [t]heirs`. With `assume_yes` the default is
//! returned without reading stdin.

use crate::error::Result;
use crate::options::Options;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Ask the user to pick one of `choices`
///
/// The raw answer is returned if it matches neither a choice nor an alias, so
/// callers decide how to treat unknown input. An empty answer selects the
/// default.
pub fn prompt(msg: &str, choices: &[&str], default: &str, opts: &Options) -> Result<String> {
    if opts.assume_yes {
        return Ok(default.to_string());
    }

    let (aliases, labels) = build_aliases(choices);

    let mut stdout = io::stdout();
    write!(stdout, "==> {} - {} ", msg, labels.join(", "))?;
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;

    Ok(expand(input.trim(), &aliases, default))
}

/// Ask a yes/no question
pub fn confirm(msg: &str, default: bool, opts: &Options) -> Result<bool> {
    let default = if default { "yes" } else { "no" };
    Ok(prompt(msg, &["yes", "no"], default, opts)? == "yes")
}

fn expand(answer: &str, aliases: &BTreeMap<String, String>, default: &str) -> String {
    if answer.is_empty() {
        return default.to_string();
    }
    aliases
        .get(answer)
        .cloned()
        .unwrap_or_else(|| answer.to_string())
}

/// Build the prefix alias table and the bracketed labels
fn build_aliases(choices: &[&str]) -> (BTreeMap<String, String>, Vec<String>) {
    let mut aliases = BTreeMap::new();
    let mut labels = Vec::with_capacity(choices.len());

    for choice in choices {
        let mut i = 1;
        while i < choice.len() && aliases.contains_key(&choice[..i]) {
            i += 1;
        }
        let i = i.min(choice.len());
        aliases.insert(choice[..i].to_string(), choice.to_string());
        aliases.insert(choice.to_string(), choice.to_string());
        labels.push(format!("[{}]{}", &choice[..i], &choice[i..]));
    }

    (aliases, labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_use_shortest_unique_prefix() {
        let (aliases, labels) = build_aliases(&["backup", "overwrite", "skip", "theirs"]);
        assert_eq!(labels, vec!["[b]ackup", "[o]verwrite", "[s]kip", "[t]heirs"]);
        assert_eq!(aliases.get("t").map(String::as_str), Some("theirs"));

        let (aliases, labels) = build_aliases(&["skip", "sync"]);
        assert_eq!(labels, vec!["[s]kip", "[sy]nc"]);
        assert_eq!(aliases.get("sy").map(String::as_str), Some("sync"));
    }

    #[test]
    fn test_expand_answers() {
        let (aliases, _) = build_aliases(&["yes", "no"]);
        assert_eq!(expand("y", &aliases, "no"), "yes");
        assert_eq!(expand("", &aliases, "no"), "no");
        assert_eq!(expand("maybe", &aliases, "no"), "maybe");
    }

    #[test]
    fn test_assume_yes_returns_default() {
        let mut opts = Options::new("/");
        opts.assume_yes = true;
        assert_eq!(prompt("?", &["a", "b"], "b", &opts).unwrap(), "b");
        assert!(confirm("?", true, &opts).unwrap());
        assert!(!confirm("?", false, &opts).unwrap());
    }
}
