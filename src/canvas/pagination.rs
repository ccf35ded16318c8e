//! `link` header pagination.
//!
//! Canvas paginates list endpoints with an RFC 8288 style header:
//!
//! ```text
//! <https://school/api/v1/courses/1/modules?page=1&per_page=10>; rel="current",
//! <https://school/api/v1/courses/1/modules?page=2&per_page=10>; rel="next", ...
//! ```

/// Page size requested from the modules endpoint.
pub const MODULES_PER_PAGE: u32 = 10;

/// Whether a `link` header advertises a `next` relation.
pub fn has_next_page(link: Option<&str>) -> bool {
    let Some(link) = link else {
        return false;
    };

    link.split(',').any(|entry| {
        entry.split(';').skip(1).any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next"))
        })
    })
}

/// URL of one page of a course's modules.
pub fn modules_page_url(base_url: &str, token: &str, course_id: &str, page: u32) -> String {
    format!(
        "{}/api/v1/courses/{}/modules?page={}&per_page={}&access_token={}",
        base_url, course_id, page, MODULES_PER_PAGE, token
    )
}
