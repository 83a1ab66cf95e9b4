use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Uniform page of results, independent of the provider's cursor format.
///
/// `count` always equals `items.len()`. `next_page` is only present when
/// `has_more` is true and the next link carried an integer `page`; a
/// `has_more` without `next_page` means "more exists, page number unknown".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDescriptor<T> {
    items: Vec<T>,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<u64>,
    has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page: Option<u64>,
}

impl<T> PageDescriptor<T> {
    pub fn new(items: Vec<T>, total: Option<u64>, next_link: Option<&str>) -> Self {
        let has_more = next_link.is_some();
        let next_page = next_link.and_then(page_from_link);
        Self {
            count: items.len(),
            items,
            total,
            has_more,
            next_page,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn next_page(&self) -> Option<u64> {
        self.next_page
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn page_from_link(link: &str) -> Option<u64> {
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
}

pub fn normalize_page(response: &Value, list_key: &str) -> PageDescriptor<Value> {
    let items = response
        .get(list_key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let total = response
        .get("meta")
        .and_then(|meta| meta.get("total"))
        .and_then(|v| v.as_u64());
    let next_link = response
        .get("links")
        .and_then(|links| links.get("pages"))
        .and_then(|pages| pages.get("next"))
        .and_then(|v| v.as_str());
    PageDescriptor::new(items, total, next_link)
}
