//! Single-file-component descriptor parsing
//!
//! Splits SFC source into its root blocks. Root blocks are `<template>`,
//! `<script>` and `<style>` tags that start a line; everything between root
//! blocks is ignored.

use crate::error::{CompilerError, Result};
use crate::normalizer::is_root_tag;
use std::collections::BTreeMap;

const ROOT_TAGS: [&str; 3] = ["template", "script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfcBlock {
    pub tag: String,
    pub content: String,
    /// Attributes in source order-independent form; valueless attributes map to `None`
    pub attrs: BTreeMap<String, Option<String>>,
    /// 1-based line of the opening tag
    pub line: usize,
}

impl SfcBlock {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(|v| v.as_deref())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn lang(&self) -> Option<&str> {
        self.attr("lang")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfcDescriptor {
    pub filename: String,
    pub source: String,
    pub template: Option<SfcBlock>,
    pub script: Option<SfcBlock>,
    pub script_setup: Option<SfcBlock>,
    pub styles: Vec<SfcBlock>,
}

impl SfcDescriptor {
    pub fn parse(source: &str, filename: &str) -> Result<Self> {
        let mut descriptor = SfcDescriptor {
            filename: filename.to_string(),
            source: source.to_string(),
            ..Default::default()
        };

        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .filter(|&i| i < source.len())
            .collect();

        let mut pos = 0;
        for (line_idx, &start) in line_starts.iter().enumerate() {
            if start < pos {
                continue;
            }
            let rest = &source[start..];
            let Some(tag) = ROOT_TAGS.iter().copied().find(|tag| is_root_tag(rest, tag)) else {
                continue;
            };

            let line = line_idx + 1;
            let (block, end) = parse_block(source, start, tag, line, filename)?;
            pos = end;
            descriptor.attach(block, filename)?;
        }

        Ok(descriptor)
    }

    fn attach(&mut self, block: SfcBlock, filename: &str) -> Result<()> {
        match block.tag.as_str() {
            "template" => {
                if self.template.is_some() {
                    return Err(CompilerError::sfc(
                        filename,
                        block.line,
                        "Single file component can contain only one <template> element",
                    ));
                }
                self.template = Some(block);
            }
            "script" if block.has_attr("setup") => {
                if self.script_setup.is_some() {
                    return Err(CompilerError::sfc(
                        filename,
                        block.line,
                        "Single file component can contain only one <script setup> element",
                    ));
                }
                self.script_setup = Some(block);
            }
            "script" => {
                if self.script.is_some() {
                    return Err(CompilerError::sfc(
                        filename,
                        block.line,
                        "Single file component can contain only one <script> element",
                    ));
                }
                self.script = Some(block);
            }
            _ => self.styles.push(block),
        }
        Ok(())
    }

    pub fn template_content(&self) -> Option<&str> {
        self.template
            .as_ref()
            .map(|t| t.content.as_str())
            .filter(|content| !content.trim().is_empty())
    }

    pub fn has_template_content(&self) -> bool {
        self.template_content().is_some()
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some() || self.script_setup.is_some()
    }
}

/// Parse one root block starting at `start`; returns the block and the offset after it
fn parse_block(source: &str, start: usize, tag: &str, line: usize, filename: &str) -> Result<(SfcBlock, usize)> {
    let open_end = source[start..]
        .find('>')
        .map(|i| start + i)
        .ok_or_else(|| CompilerError::sfc(filename, line, format!("Unterminated <{}> tag", tag)))?;

    let attr_text = &source[start + 1 + tag.len()..open_end];
    let self_closing = attr_text.trim_end().ends_with('/');
    let attrs = parse_attributes(attr_text.trim_end().trim_end_matches('/'));

    if self_closing {
        let block = SfcBlock {
            tag: tag.to_string(),
            content: String::new(),
            attrs,
            line,
        };
        return Ok((block, open_end + 1));
    }

    let content_start = open_end + 1;
    let close = if tag == "template" {
        find_template_close(source, content_start)
    } else {
        let closing = format!("</{}>", tag);
        source[content_start..]
            .find(&closing)
            .map(|i| (content_start + i, content_start + i + closing.len()))
    };
    let (close_start, close_end) = close
        .ok_or_else(|| CompilerError::sfc(filename, line, format!("Element <{}> is missing end tag", tag)))?;

    let block = SfcBlock {
        tag: tag.to_string(),
        content: source[content_start..close_start].to_string(),
        attrs,
        line,
    };
    Ok((block, close_end))
}

/// Match `</template>` while skipping nested `<template ...>` elements
fn find_template_close(source: &str, from: usize) -> Option<(usize, usize)> {
    const CLOSE: &str = "</template>";
    let mut depth = 1usize;
    let mut pos = from;

    while pos < source.len() {
        let next = source[pos..].find('<')? + pos;
        let rest = &source[next..];
        if rest.starts_with(CLOSE) {
            depth -= 1;
            if depth == 0 {
                return Some((next, next + CLOSE.len()));
            }
            pos = next + CLOSE.len();
        } else if is_root_tag(rest, "template") {
            let tag_end = rest.find('>')? + next;
            if !source[next..tag_end].ends_with('/') {
                depth += 1;
            }
            pos = tag_end + 1;
        } else {
            pos = next + 1;
        }
    }
    None
}

fn parse_attributes(text: &str) -> BTreeMap<String, Option<String>> {
    let mut attrs = BTreeMap::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut name = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            name.push(c);
        }
        if name.is_empty() {
            break;
        }

        if chars.next_if_eq(&'=').is_none() {
            attrs.insert(name, None);
            continue;
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                for c in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }
            }
        }
        attrs.insert(name, Some(value));
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_markup() {
        let desc = SfcDescriptor::parse("<template><button>Hi</button></template>", "demo.vue").unwrap();

        assert_eq!(desc.template_content(), Some("<button>Hi</button>"));
        assert!(!desc.has_script());
        assert!(desc.styles.is_empty());
    }

    #[test]
    fn test_parse_full_component() {
        let source = r#"<script setup lang="ts">
import { ref } from 'vue'
const count = ref(0)
</script>

<template>
  <div>
    <template v-if="count">{{ count }}</template>
  </div>
</template>

<style scoped>
div { color: red; }
</style>
"#;
        let desc = SfcDescriptor::parse(source, "demo.vue").unwrap();

        let setup = desc.script_setup.as_ref().unwrap();
        assert_eq!(setup.lang(), Some("ts"));
        assert_eq!(setup.line, 1);
        assert!(setup.content.contains("const count = ref(0)"));

        let template = desc.template.as_ref().unwrap();
        assert_eq!(template.line, 6);
        assert!(template.content.contains("<template v-if=\"count\">{{ count }}</template>"));
        assert!(template.content.trim_end().ends_with("</div>"));

        assert_eq!(desc.styles.len(), 1);
        assert!(desc.styles[0].has_attr("scoped"));
        assert_eq!(desc.source, source);
    }

    #[test]
    fn test_empty_template_has_no_content() {
        let desc = SfcDescriptor::parse("<template>\n  \n</template>", "x.vue").unwrap();
        assert!(desc.template.is_some());
        assert!(!desc.has_template_content());
    }

    #[test]
    fn test_missing_end_tag() {
        let err = SfcDescriptor::parse("<template>\n<p>open", "broken.vue").unwrap_err();
        match err {
            CompilerError::Sfc { file, line, message } => {
                assert_eq!(file, "broken.vue");
                assert_eq!(line, 1);
                assert!(message.contains("missing end tag"));
            }
            other => panic!("Expected SFC error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_template_rejected() {
        let result = SfcDescriptor::parse("<template>a</template>\n<template>b</template>", "x.vue");
        assert!(matches!(result, Err(CompilerError::Sfc { line: 2, .. })));
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#" setup lang="ts" src='./a.js' data-x=1 "#);
        assert_eq!(attrs.get("setup"), Some(&None));
        assert_eq!(attrs.get("lang"), Some(&Some("ts".to_string())));
        assert_eq!(attrs.get("src"), Some(&Some("./a.js".to_string())));
        assert_eq!(attrs.get("data-x"), Some(&Some("1".to_string())));
    }
}
