//! Render-time lookup that always produces a displayable string.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::document::LocaleDocument;
use crate::keypath::KeyPath;

/// Translation capability bound to the active locale.
pub trait Translator {
    fn has(&self, key: &str) -> bool;
    fn get(&self, key: &str) -> String;
}

/// Translator over loaded messages, optionally scoped to a namespace and
/// backed by a fallback document (usually the canonical locale).
#[derive(Debug, Clone, Copy)]
pub struct MessagesTranslator<'a> {
    messages: &'a LocaleDocument,
    namespace: Option<&'a str>,
    fallback: Option<&'a LocaleDocument>,
}

impl<'a> MessagesTranslator<'a> {
    #[must_use]
    pub const fn new(messages: &'a LocaleDocument) -> Self {
        Self {
            messages,
            namespace: None,
            fallback: None,
        }
    }

    /// Resolve every key relative to `namespace`, like a scoped
    /// `useTranslations("Docs")` hook.
    #[must_use]
    pub const fn scoped(mut self, namespace: &'a str) -> Self {
        self.namespace = Some(namespace);
        self
    }

    #[must_use]
    pub const fn with_fallback(mut self, fallback: &'a LocaleDocument) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn full_path(&self, key: &str) -> Option<KeyPath> {
        match self.namespace {
            Some(ns) if !ns.is_empty() => KeyPath::parse(&format!("{ns}.{key}")).ok(),
            _ => KeyPath::parse(key).ok(),
        }
    }

    fn value(&self, key: &str) -> Option<&'a str> {
        let path = self.full_path(key)?;
        let non_empty = |doc: &'a LocaleDocument| {
            doc.get(&path)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        };
        non_empty(self.messages).or_else(|| self.fallback.and_then(non_empty))
    }

    /// Translated text with `{name}` and `{{name}}` replaced from `args`.
    #[must_use]
    pub fn format(&self, key: &str, args: &BTreeMap<&str, &str>) -> Option<String> {
        let mut text = self.value(key)?.to_string();
        for (k, v) in args {
            text = text.replace(&format!("{{{{{k}}}}}"), v);
            text = text.replace(&format!("{{{k}}}"), v);
        }
        Some(text)
    }
}

impl Translator for MessagesTranslator<'_> {
    fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    fn get(&self, key: &str) -> String {
        self.value(key).map_or_else(|| key.to_string(), str::to_string)
    }
}

/// Translated value, else `fallback`, else a label derived from the key.
/// Never fails and never returns an empty string.
#[must_use]
pub fn resolve<T: Translator + ?Sized>(translator: &T, key: &str, fallback: Option<&str>) -> String {
    if translator.has(key) {
        let value = translator.get(key);
        if !value.trim().is_empty() {
            return value;
        }
    }
    match fallback {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => humanize_key(key),
    }
}

/// Readable label from the final segment of a dotted key.
///
/// `quickLinks` becomes `Quick Links`, `parseHTMLString` becomes
/// `Parse HTML String`, and `_`/`-` become spaces.
#[must_use]
pub fn humanize_key(key: &str) -> String {
    let segment = key.rsplit('.').next().unwrap_or_default();
    let chars: Vec<char> = segment.chars().collect();
    let mut spaced = String::with_capacity(segment.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                spaced.push(' ');
            }
        }
        spaced.push(if c == '_' || c == '-' { ' ' } else { c });
    }

    let words: Vec<&str> = spaced.split_whitespace().collect();
    let joined = words.join(" ");
    let mut out = joined.chars();
    match out.next() {
        Some(first) => first.to_uppercase().chain(out).collect(),
        None => "Untitled".to_string(),
    }
}
