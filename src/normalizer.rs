//! Snippet normalization: guarantee a root `<template>` block

/// True when a line starts with a root `<template>` opening tag.
///
/// Only unindented tags count, so a nested `<template v-if>` inside bare
/// markup does not suppress wrapping.
pub fn has_template_root(source: &str) -> bool {
    source.lines().any(|line| is_root_tag(line, "template"))
}

pub(crate) fn is_root_tag(line: &str, tag: &str) -> bool {
    let Some(rest) = line.strip_prefix('<').and_then(|l| l.strip_prefix(tag)) else {
        return false;
    };
    matches!(rest.chars().next(), Some(c) if c == '>' || c == '/' || c.is_whitespace())
}

/// Wrap bare markup in a template root; text that already has one is returned unchanged.
pub fn normalize_snippet(raw: &str) -> String {
    if has_template_root(raw) {
        raw.to_string()
    } else {
        format!("<template>{}</template>", raw)
    }
}
