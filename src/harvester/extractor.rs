//! Field extraction from record pages
//!
//! This module turns a record page into `RawFields`. Each field is looked up
//! on its own, so a page missing one field still yields all the others.
//!
//! The coordinator only sees the [`FieldExtractor`] trait. [`CatalogExtractor`]
//! knows the Koha OPAC detail page layout:
//! - Title from the first `<h1>`
//! - Labelled fields from `<span class="label">` and the element around it
//! - Holdings from the first `<tr typeof="Offer">` row

use scraper::{ElementRef, Html, Selector};

/// Best-effort fields pulled from one record page
///
/// `None` and an empty `subjects` list mean the page did not provide the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub co_author: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub subjects: Vec<String>,
    pub item_type: Option<String>,
    pub shelving_location: Option<String>,
    pub call_number: Option<String>,
}

/// Maps a fetched page body to structured fields
pub trait FieldExtractor {
    fn extract(&self, body: &str) -> RawFields;
}

/// Label texts identifying each labelled field on the detail page
#[derive(Debug, Clone)]
pub struct FieldLabels {
    pub author: String,
    pub co_author: String,
    pub language: String,
    pub country: String,
    pub subjects: String,
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self {
            author: "Autor".to_string(),
            co_author: "Co-autor".to_string(),
            language: "Idioma".to_string(),
            country: "País".to_string(),
            subjects: "Nome comum".to_string(),
        }
    }
}

/// Extractor for Koha OPAC record detail pages
#[derive(Debug, Clone, Default)]
pub struct CatalogExtractor {
    labels: FieldLabels,
}

impl CatalogExtractor {
    pub fn new(labels: FieldLabels) -> Self {
        Self { labels }
    }
}

impl FieldExtractor for CatalogExtractor {
    /// Extracts all known fields from a detail page
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_harvest::harvester::{CatalogExtractor, FieldExtractor};
    ///
    /// let html = r#"<html><body><h1>Os Lusíadas</h1></body></html>"#;
    /// let fields = CatalogExtractor::default().extract(html);
    /// assert_eq!(fields.title.as_deref(), Some("Os Lusíadas"));
    /// assert_eq!(fields.author, None);
    /// ```
    fn extract(&self, body: &str) -> RawFields {
        let document = Html::parse_document(body);
        let labels = label_elements(&document);
        let holdings = holdings_row(&document);

        let labelled = |text: &str| labelled_container(&labels, text);

        RawFields {
            title: extract_title(&document),
            author: labelled(&self.labels.author)
                .and_then(|c| first_descendant_text(c, "a")),
            co_author: labelled(&self.labels.co_author)
                .and_then(|c| first_descendant_text(c, "a")),
            language: labelled(&self.labels.language)
                .and_then(|c| nth_descendant_text(c, "span", 1)),
            country: labelled(&self.labels.country)
                .and_then(|c| nth_descendant_text(c, "span", 1)),
            subjects: labelled(&self.labels.subjects)
                .map(|c| all_descendant_texts(c, "a"))
                .unwrap_or_default(),
            item_type: holdings.and_then(|row| select_text(row, "td.itype")),
            shelving_location: holdings.and_then(|row| select_text(row, "span.shelvingloc")),
            call_number: holdings.and_then(|row| select_text(row, "td.call_no")),
        }
    }
}

/// Extracts the record title from the first `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1").ok()?;
    document.select(&selector).next().and_then(element_text)
}

fn label_elements(document: &Html) -> Vec<ElementRef<'_>> {
    match Selector::parse("span.label") {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn holdings_row(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse(r#"tr[typeof="Offer"]"#).ok()?;
    document.select(&selector).next()
}

/// Finds the element wrapping the first label whose text contains `text`
///
/// Only the first matching label is considered, even if its container turns
/// out to hold no value.
fn labelled_container<'a>(labels: &[ElementRef<'a>], text: &str) -> Option<ElementRef<'a>> {
    labels
        .iter()
        .find(|label| label.text().collect::<String>().contains(text))
        .and_then(|label| label.parent())
        .and_then(ElementRef::wrap)
}

/// Elements named `name` strictly below `container`
fn descendants_named<'a>(
    container: ElementRef<'a>,
    name: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    container
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |element| element.value().name() == name)
}

fn first_descendant_text(container: ElementRef<'_>, name: &str) -> Option<String> {
    descendants_named(container, name).next().and_then(element_text)
}

fn nth_descendant_text(container: ElementRef<'_>, name: &str, n: usize) -> Option<String> {
    descendants_named(container, name).nth(n).and_then(element_text)
}

fn all_descendant_texts(container: ElementRef<'_>, name: &str) -> Vec<String> {
    descendants_named(container, name)
        .filter_map(element_text)
        .collect()
}

fn select_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next().and_then(element_text)
}

/// Whitespace-normalized text content; `None` when empty
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
