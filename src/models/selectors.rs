// src/models/selectors.rs

//! CSS selector tables for each portal.
//!
//! Every list is ordered: newer, more specific markup first, older generic
//! fallbacks last. Lookups stop at the first non-empty match.

/// How a candidate element's `class` attribute must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassMatch {
    /// The attribute contains this substring, ignoring ASCII case
    ContainsIgnoreCase(&'static str),
}

impl ClassMatch {
    pub fn matches(&self, class_attr: &str) -> bool {
        match self {
            ClassMatch::ContainsIgnoreCase(needle) => class_attr
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

/// What a matched container element represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// The first match wraps the listings; listings are its descendant `li`s
    Wrapper,
    /// Every match is a listing
    Items,
}

/// One heuristic for locating the listing nodes on a result page.
#[derive(Debug, Clone, Copy)]
pub struct ContainerStrategy {
    pub name: &'static str,
    pub selector: &'static str,
    pub class: Option<ClassMatch>,
    pub kind: ContainerKind,
}

/// Where a field's value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Trimmed text content
    Text,
    /// Trimmed attribute value
    Attr(&'static str),
}

/// One selector in a field's fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub selector: &'static str,
    pub source: Source,
}

impl Lookup {
    pub const fn text(selector: &'static str) -> Self {
        Self {
            selector,
            source: Source::Text,
        }
    }

    pub const fn attr(selector: &'static str, name: &'static str) -> Self {
        Self {
            selector,
            source: Source::Attr(name),
        }
    }
}

/// Single selectors for a listing's own page.
#[derive(Debug, Clone, Copy)]
pub struct DetailSelectors {
    pub title: &'static str,
    pub location: &'static str,
    pub description: &'static str,
    pub price: &'static str,
}

/// propertyfinder.ae search results.
pub mod property_finder {
    use super::*;

    pub const CONTAINERS: &[ContainerStrategy] = &[
        ContainerStrategy {
            name: "desktop-container",
            selector: "ul.styles_desktop_containerV85pq",
            class: None,
            kind: ContainerKind::Wrapper,
        },
        ContainerStrategy {
            name: "container-class",
            selector: "ul[class]",
            class: Some(ClassMatch::ContainsIgnoreCase("container")),
            kind: ContainerKind::Wrapper,
        },
        ContainerStrategy {
            name: "property-class",
            selector: "div[class]",
            class: Some(ClassMatch::ContainsIgnoreCase("property")),
            kind: ContainerKind::Wrapper,
        },
        ContainerStrategy {
            name: "list-item-testid",
            selector: r#"li[data-testid="list-item"]"#,
            class: None,
            kind: ContainerKind::Items,
        },
        ContainerStrategy {
            name: "data-id",
            selector: "li[data-id]",
            class: None,
            kind: ContainerKind::Items,
        },
        ContainerStrategy {
            name: "property-card-article",
            selector: r#"article[class*="property-card"]"#,
            class: None,
            kind: ContainerKind::Items,
        },
    ];

    pub const PROPERTY_TYPE: &[Lookup] = &[Lookup::text(r#"p[data-testid="property-card-type"]"#)];
    pub const PRICE: &[Lookup] = &[Lookup::text(r#"p[data-testid="property-card-price"]"#)];
    pub const TITLE: &[Lookup] = &[Lookup::text(r#"h2[class*="title"]"#), Lookup::text("h2")];
    pub const LOCATION: &[Lookup] = &[Lookup::text(r#"p[class*="location"]"#)];
    pub const AREA: &[Lookup] = &[Lookup::text(r#"p[data-testid="property-card-spec-area"]"#)];
    pub const LINK: &[Lookup] = &[
        Lookup::attr(r#"a[data-testid="property-card-link"]"#, "href"),
        Lookup::attr("a", "href"),
    ];
    pub const LISTING_STATUS: &[Lookup] = &[Lookup::text(r#"p[class*="listing-level"]"#)];
    pub const IS_NEW: &[Lookup] = &[Lookup::text(r#"button[data-testid="property-card-tag"]"#)];
    pub const LISTED_TIME: &[Lookup] = &[Lookup::text(r#"p[class*="publish-info"]"#)];
    pub const PHONE: &[Lookup] = &[Lookup::attr(
        r#"a[data-testid="property-card-contact-action-CALL"]"#,
        "href",
    )];
    pub const IMAGE_COUNT: &[Lookup] = &[Lookup::text(r#"span[class*="image-count"]"#)];

    /// Spec rows (beds, baths, area) in any order.
    pub const SPECS: &str = r#"p[data-testid*="property-card-spec"]"#;

    pub const DETAIL: DetailSelectors = DetailSelectors {
        title: "h1.styles_desktop_title__j0uNx",
        location: "p.styles-module_map__title__M2mBC",
        description: "article.styles_description__tKGaD",
        price: "p.styles_desktop_navigator__price__BYvcC",
    };
}

/// bayut.com search results.
pub mod bayut {
    use super::*;

    pub const CONTAINERS: &[ContainerStrategy] = &[
        ContainerStrategy {
            name: "results-list",
            selector: "ul.e20beb46",
            class: None,
            kind: ContainerKind::Wrapper,
        },
        ContainerStrategy {
            name: "article-role",
            selector: r#"li[role="article"]"#,
            class: None,
            kind: ContainerKind::Items,
        },
    ];

    /// Structured data embedded in each card.
    pub const JSON_LD: &str = r#"script[type="application/ld+json"]"#;

    pub const PRICE: &[Lookup] = &[
        Lookup::text("span.f343d9ce"),
        Lookup::text(r#"[aria-label="Price"]"#),
    ];
    pub const LOCATION: &[Lookup] = &[
        Lookup::text("div._7e396fc3"),
        Lookup::text(r#"[aria-label="Location"]"#),
    ];
    pub const PROPERTY_TYPE: &[Lookup] = &[Lookup::text(r#"[aria-label="Type"]"#)];
    pub const LINK: &[Lookup] = &[Lookup::attr("a[href]", "href")];

    /// Elements that may hold the `Ref` reference text.
    pub const REFERENCE_CANDIDATES: &str = "span";

    pub const DETAIL: DetailSelectors = DetailSelectors {
        title: "h1",
        location: r#"[aria-label="Property header"]"#,
        description: r#"[aria-label="Property description"]"#,
        price: r#"[aria-label="Price"]"#,
    };
}
