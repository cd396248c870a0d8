//! CSS-selector document queries backed by `scraper`

use crate::query::{DocumentQuery, Extraction, ImageAction, ImageScan, LinkMatch, QueryError};
use scraper::node::Element;
use scraper::{Html, Node, Selector};
use std::collections::HashMap;

/// [`DocumentQuery`] implementation interpreting rules as CSS selectors
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperQuery;

impl ScraperQuery {
    pub fn new() -> Self {
        Self
    }
}

/// Parses a rule into a selector
fn parse_rule(rule: &str) -> Result<Selector, QueryError> {
    let trimmed = rule.trim();
    if trimmed.is_empty() {
        return Err(QueryError::EmptyRule);
    }

    Selector::parse(trimmed).map_err(|e| QueryError::InvalidRule {
        rule: trimmed.to_string(),
        message: format!("{:?}", e),
    })
}

fn image_selector() -> Option<Selector> {
    Selector::parse("img").ok()
}

impl DocumentQuery for ScraperQuery {
    fn links(&self, html: &str, rule: &str) -> Result<Vec<LinkMatch>, QueryError> {
        let selector = parse_rule(rule)?;
        let document = Html::parse_document(html);

        Ok(document
            .select(&selector)
            .map(|element| LinkMatch {
                href: element.value().attr("href").map(str::to_string),
                text: element.text().collect::<String>(),
            })
            .collect())
    }

    fn extract(
        &self,
        html: &str,
        content_rule: &str,
        remove_rules: &[String],
    ) -> Result<Extraction, QueryError> {
        let content_selector = parse_rule(content_rule)?;
        let mut document = Html::parse_document(html);
        let mut rule_errors = Vec::new();

        for rule in remove_rules {
            // Blank entries come from splitting user lists like "a; ;b"
            if rule.trim().is_empty() {
                continue;
            }

            let selector = match parse_rule(rule) {
                Ok(selector) => selector,
                Err(e) => {
                    rule_errors.push(e);
                    continue;
                }
            };

            let matched: Vec<_> = document.select(&selector).map(|e| e.id()).collect();
            for id in matched {
                if let Some(mut node) = document.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        let content = document
            .select(&content_selector)
            .next()
            .map(|element| element.html());

        Ok(Extraction {
            content,
            rule_errors,
        })
    }

    fn image_sources(&self, fragment: &str) -> ImageScan {
        let Some(selector) = image_selector() else {
            return ImageScan::default();
        };
        let document = Html::parse_fragment(fragment);

        let mut scan = ImageScan::default();
        for element in document.select(&selector) {
            match element.value().attr("src") {
                Some(src) => scan.sources.push(src.to_string()),
                None => scan.missing_src += 1,
            }
        }
        scan
    }

    fn rewrite_images(&self, fragment: &str, actions: &HashMap<String, ImageAction>) -> String {
        let Some(selector) = image_selector() else {
            return fragment.to_string();
        };
        let mut document = Html::parse_fragment(fragment);

        let mut removals = Vec::new();
        let mut replacements = Vec::new();
        for element in document.select(&selector) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };

            match actions.get(src) {
                Some(ImageAction::Remove) => removals.push(element.id()),
                Some(ImageAction::Replace(local)) if local != src => {
                    if let Some(node) = replacement_image(element.value(), local) {
                        replacements.push((element.id(), node));
                    }
                }
                _ => {}
            }
        }

        if removals.is_empty() && replacements.is_empty() {
            return fragment.to_string();
        }

        for (id, replacement) in replacements {
            if let Some(mut node) = document.tree.get_mut(id) {
                *node.value() = replacement;
            }
        }
        for id in removals {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        document.root_element().inner_html()
    }
}

/// Builds a copy of an `<img>` element pointing at `local`
///
/// `srcset` is dropped along with the old `src`, since its candidates would
/// still point at remote URLs.
fn replacement_image(original: &Element, local: &str) -> Option<Node> {
    let mut markup = String::from("<img");
    for (name, value) in original.attrs() {
        if name == "src" || name == "srcset" {
            continue;
        }
        markup.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
    }
    markup.push_str(&format!(" src=\"{}\">", escape_attribute(local)));

    let parsed = Html::parse_fragment(&markup);
    let selector = image_selector()?;
    let element = parsed.select(&selector).next()?.value().clone();
    Some(Node::Element(element))
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
