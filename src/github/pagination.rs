//! Link header pagination.
//!
//! GitHub advertises further pages in a `Link` response header:
//! `<https://api.github.com/repos/o/r/collaborators?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`.
//! A response without a `next` relation is the last page. The `next` target
//! is kept verbatim since it is not always page-numbered (cursor links carry
//! `after=` instead).

use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    pub next: Option<String>,
    pub last_page: Option<u32>,
}

pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';').map(str::trim) {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"'));
            }
        }

        let (Some(url), Some(rel)) = (url, rel) else {
            continue;
        };
        match rel {
            "next" => info.next = Some(url.to_string()),
            "last" => info.last_page = page_param(url),
            _ => {}
        }
    }

    info
}

fn page_param(raw: &str) -> Option<u32> {
    let url = Url::parse(raw).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}
