// src/services/fields.rs

//! Listing card field extraction.
//!
//! Each field is read through an ordered chain of selectors; the first
//! non-empty value wins and a field nobody matches becomes `"N/A"`. Fields
//! are independent, so one missing element never costs the whole record.

use scraper::{ElementRef, Selector};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::selectors::{Lookup, Source, bayut, property_finder};
use crate::models::{ListingFields, NOT_AVAILABLE, Portal};
use crate::utils::{normalize_whitespace, resolve_url};

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Read a value from an element; `None` when empty.
fn read(element: ElementRef<'_>, source: Source) -> Option<String> {
    let value = match source {
        Source::Text => normalize_whitespace(&element.text().collect::<String>()),
        Source::Attr(name) => element.value().attr(name)?.trim().to_string(),
    };
    (!value.is_empty()).then_some(value)
}

/// A compiled fallback chain for one field.
#[derive(Debug)]
pub struct FieldChain {
    lookups: Vec<(Selector, Source)>,
}

impl FieldChain {
    pub fn compile(lookups: &[Lookup]) -> Result<Self> {
        let lookups = lookups
            .iter()
            .map(|l| Ok((parse_selector(l.selector)?, l.source)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { lookups })
    }

    /// First non-empty value, trying each selector's first match in order.
    pub fn first(&self, node: ElementRef<'_>) -> Option<String> {
        self.lookups.iter().find_map(|(selector, source)| {
            node.select(selector)
                .next()
                .and_then(|element| read(element, *source))
        })
    }

    /// Like [`first`](Self::first) but falls back to `"N/A"`.
    pub fn get(&self, node: ElementRef<'_>) -> String {
        self.first(node)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

fn source_id(node: ElementRef<'_>) -> Option<String> {
    node.value()
        .attr("data-id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Field extraction for one portal's listing cards.
#[derive(Debug)]
pub enum FieldExtractor {
    PropertyFinder(PropertyFinderFields),
    Bayut(BayutFields),
}

impl FieldExtractor {
    pub fn for_portal(portal: Portal) -> Result<Self> {
        match portal {
            Portal::PropertyFinder => Ok(Self::PropertyFinder(PropertyFinderFields::new()?)),
            Portal::Bayut => Ok(Self::Bayut(BayutFields::new()?)),
        }
    }

    /// Extract all fields of one listing card.
    ///
    /// Fails only when the node cannot be a listing at all.
    pub fn extract(&self, node: ElementRef<'_>) -> Result<ListingFields> {
        match self {
            Self::PropertyFinder(fields) => Ok(fields.extract(node)),
            Self::Bayut(fields) => fields.extract(node),
        }
    }
}

/// propertyfinder.ae card fields.
#[derive(Debug)]
pub struct PropertyFinderFields {
    property_type: FieldChain,
    price: FieldChain,
    title: FieldChain,
    location: FieldChain,
    area: FieldChain,
    link: FieldChain,
    listing_status: FieldChain,
    is_new: FieldChain,
    listed_time: FieldChain,
    phone: FieldChain,
    image_count: FieldChain,
    specs: Selector,
    origin: Url,
}

impl PropertyFinderFields {
    pub fn new() -> Result<Self> {
        use property_finder as pf;

        Ok(Self {
            property_type: FieldChain::compile(pf::PROPERTY_TYPE)?,
            price: FieldChain::compile(pf::PRICE)?,
            title: FieldChain::compile(pf::TITLE)?,
            location: FieldChain::compile(pf::LOCATION)?,
            area: FieldChain::compile(pf::AREA)?,
            link: FieldChain::compile(pf::LINK)?,
            listing_status: FieldChain::compile(pf::LISTING_STATUS)?,
            is_new: FieldChain::compile(pf::IS_NEW)?,
            listed_time: FieldChain::compile(pf::LISTED_TIME)?,
            phone: FieldChain::compile(pf::PHONE)?,
            image_count: FieldChain::compile(pf::IMAGE_COUNT)?,
            specs: parse_selector(pf::SPECS)?,
            origin: Url::parse(Portal::PropertyFinder.origin())?,
        })
    }

    pub fn extract(&self, node: ElementRef<'_>) -> ListingFields {
        let (bedrooms, bathrooms) = self.bed_bath(node);

        let property_url = self
            .link
            .first(node)
            .map(|href| resolve_url(&self.origin, &href))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let phone = self
            .phone
            .first(node)
            .map(|href| href.trim_start_matches("tel:").to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        ListingFields {
            source_id: source_id(node),
            property_type: self.property_type.get(node),
            price: self.price.get(node),
            title: self.title.get(node),
            location: self.location.get(node),
            area: self.area.get(node),
            bedrooms,
            bathrooms,
            listing_status: self.listing_status.get(node),
            is_new: self.is_new.get(node),
            listed_time: self.listed_time.get(node),
            phone,
            listing_image_count: self.image_count.get(node),
            property_url,
            extra: Vec::new(),
        }
    }

    /// Classify spec rows by keyword so reordered specs still land right.
    fn bed_bath(&self, node: ElementRef<'_>) -> (String, String) {
        let mut bedrooms = NOT_AVAILABLE.to_string();
        let mut bathrooms = NOT_AVAILABLE.to_string();

        for spec in node.select(&self.specs) {
            let Some(text) = read(spec, Source::Text) else {
                continue;
            };
            let lower = text.to_lowercase();
            if lower.contains("bed") {
                bedrooms = text;
            } else if lower.contains("bath") {
                bathrooms = text;
            }
        }

        (bedrooms, bathrooms)
    }
}

/// bayut.com card fields, primarily from the card's JSON-LD block.
#[derive(Debug)]
pub struct BayutFields {
    json_ld: Selector,
    price: FieldChain,
    location: FieldChain,
    property_type: FieldChain,
    link: FieldChain,
    reference: Selector,
    origin: Url,
}

/// Extra columns every Bayut record carries.
const BAYUT_EXTRA: [&str; 3] = ["latitude", "longitude", "reference"];

impl BayutFields {
    pub fn new() -> Result<Self> {
        Ok(Self {
            json_ld: parse_selector(bayut::JSON_LD)?,
            price: FieldChain::compile(bayut::PRICE)?,
            location: FieldChain::compile(bayut::LOCATION)?,
            property_type: FieldChain::compile(bayut::PROPERTY_TYPE)?,
            link: FieldChain::compile(bayut::LINK)?,
            reference: parse_selector(bayut::REFERENCE_CANDIDATES)?,
            origin: Url::parse(Portal::Bayut.origin())?,
        })
    }

    pub fn extract(&self, node: ElementRef<'_>) -> Result<ListingFields> {
        let data = self.structured_data(node);
        let link = self.link.first(node);

        if data.is_none() && link.is_none() {
            return Err(AppError::parse(
                "bayut listing",
                "card has neither structured data nor a link",
            ));
        }
        let data = data.unwrap_or(Value::Null);

        let property_url = json_text(&data["url"])
            .or(link)
            .map(|href| resolve_url(&self.origin, &href))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let area = match (
            json_text(&data["floorSize"]["value"]),
            json_text(&data["floorSize"]["unitText"]),
        ) {
            (Some(value), Some(unit)) => format!("{value} {unit}"),
            (Some(value), None) => value,
            _ => NOT_AVAILABLE.to_string(),
        };

        let json_location = [
            json_text(&data["address"]["addressLocality"]),
            json_text(&data["address"]["addressRegion"]),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

        let location = self
            .location
            .first(node)
            .or_else(|| (!json_location.is_empty()).then_some(json_location))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let na = || NOT_AVAILABLE.to_string();
        let extra = BAYUT_EXTRA
            .iter()
            .map(|name| {
                let value = match *name {
                    "latitude" => json_text(&data["geo"]["latitude"]),
                    "longitude" => json_text(&data["geo"]["longitude"]),
                    _ => self.reference_text(node),
                };
                (name.to_string(), value.unwrap_or_else(na))
            })
            .collect();

        Ok(ListingFields {
            source_id: source_id(node),
            property_type: self.property_type.get(node),
            price: self.price.get(node),
            title: json_text(&data["name"]).unwrap_or_else(na),
            location,
            area,
            bedrooms: json_text(&data["numberOfRooms"]["value"]).unwrap_or_else(na),
            bathrooms: json_text(&data["numberOfBathroomsTotal"]).unwrap_or_else(na),
            property_url,
            extra,
            ..ListingFields::default()
        })
    }

    /// The card's JSON-LD object, if present and well-formed.
    fn structured_data(&self, node: ElementRef<'_>) -> Option<Value> {
        let script = node.select(&self.json_ld).next()?;
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_object() => Some(value),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Ignoring malformed JSON-LD in listing card: {}", e);
                None
            }
        }
    }

    fn reference_text(&self, node: ElementRef<'_>) -> Option<String> {
        node.select(&self.reference)
            .filter_map(|span| read(span, Source::Text))
            .find(|text| text.contains("Ref"))
    }
}

/// Text of a JSON scalar; strings are trimmed, numbers printed as-is.
fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
