//! HTML rendering for directory pages.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping. The
//! stylesheet is embedded at compile time from `static/style.css`.
//!
//! ## Page layout
//!
//! ```text
//! header.site-header
//!   h1.site-title          configured title
//!   nav.breadcrumb         (root) / a / b
//! main
//!   ul.folders             one link per subdirectory
//!   div.picture-grid       one figure per picture, thumbnail linked to the original
//! ```
//!
//! Admins additionally get a hide/show button under each picture. The
//! button posts `action=hide` or `action=show` to the picture's own URL.

use crate::access::Access;
use crate::gallery::{Breadcrumb, DirectoryEntry, Listing};
use maud::{DOCTYPE, Markup, html};

const CSS: &str = include_str!("../static/style.css");

/// Percent-encode each segment of a URL path, keeping the `/` separators.
pub fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Render the page for one directory listing.
pub fn render_listing(title: &str, listing: &Listing, access: Access) -> Markup {
    let page_title = if listing.path.is_root() {
        title.to_string()
    } else {
        format!("{} · {}", listing.path, title)
    };
    let content = html! {
        (site_header(title, &listing.breadcrumbs))
        main {
            @if !listing.dirs.is_empty() {
                ul.folders {
                    @for dir in &listing.dirs {
                        li { a href=(encode_path(&dir.relative_path.dir_url())) { (dir.name) } }
                    }
                }
            }
            @if listing.files.is_empty() {
                p.empty { "No pictures here." }
            } @else {
                div.picture-grid {
                    @for file in &listing.files {
                        (render_picture(file, access))
                    }
                }
            }
        }
    };
    base_document(&page_title, CSS, content)
}

// ============================================================================
// HTML Components
// ============================================================================

fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (css) }
            }
            body {
                (content)
            }
        }
    }
}

fn site_header(title: &str, breadcrumbs: &[Breadcrumb]) -> Markup {
    html! {
        header.site-header {
            h1.site-title { (title) }
            nav.breadcrumb {
                ol {
                    @for crumb in breadcrumbs {
                        @if crumb.active {
                            li.active aria-current="page" { (crumb.name) }
                        } @else {
                            li { a href=(encode_path(&crumb.path)) { (crumb.name) } }
                        }
                    }
                }
            }
        }
    }
}

fn render_picture(file: &DirectoryEntry, access: Access) -> Markup {
    let href = encode_path(&file.relative_path.to_string());
    html! {
        figure.picture.is-hidden[file.hidden] {
            a href=(href) {
                img src={ (href) "?thumbnail" } alt=(file.name) loading="lazy" width="256" height="256";
            }
            figcaption {
                span { (file.name) }
                @if access.is_admin() {
                    form method="post" action=(href) {
                        @if file.hidden {
                            button type="submit" name="action" value="show" { "show" }
                        } @else {
                            button type="submit" name="action" value="hide" { "hide" }
                        }
                    }
                }
            }
        }
    }
}
