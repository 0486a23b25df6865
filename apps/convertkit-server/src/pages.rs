//! HTML pages
//!
//! Templates are compiled in. The only dynamic content is the error alert,
//! which is HTML-escaped before it is inserted.

use axum::response::{Html, Redirect};

const LAYOUT: &str = include_str!("../templates/layout.html");
const INDEX_BODY: &str = include_str!("../templates/index.html");
const PDF_BODY: &str = include_str!("../templates/pdf.html");
const IMAGES_BODY: &str = include_str!("../templates/images.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Index,
    Pdf,
    Images,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Index => "/",
            Page::Pdf => "/pdf/",
            Page::Images => "/images/",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Page::Index => "convertkit",
            Page::Pdf => "PDF tools",
            Page::Images => "Image tools",
        }
    }

    fn body(self) -> &'static str {
        match self {
            Page::Index => INDEX_BODY,
            Page::Pdf => PDF_BODY,
            Page::Images => IMAGES_BODY,
        }
    }

    pub fn render(self, error: Option<&str>) -> Html<String> {
        let alert = error
            .map(|message| {
                format!(
                    r#"<div class="alert" role="alert">{}</div>"#,
                    html_escape::encode_text(message)
                )
            })
            .unwrap_or_default();

        Html(
            LAYOUT
                .replace("{{body}}", self.body())
                .replace("{{title}}", self.title())
                .replace("{{alert}}", &alert),
        )
    }

    /// 303 back to this page
    pub fn redirect(self) -> Redirect {
        Redirect::to(self.path())
    }
}

/// Handler: GET /
pub async fn index() -> Html<String> {
    Page::Index.render(None)
}

/// Handler: GET /pdf/
pub async fn pdf_tools() -> Html<String> {
    Page::Pdf.render(None)
}

/// Handler: GET /images/
pub async fn image_tools() -> Html<String> {
    Page::Images.render(None)
}

/// Handler: GET on a PDF endpoint
pub async fn to_pdf_tools() -> Redirect {
    Page::Pdf.redirect()
}

/// Handler: GET on an image endpoint
pub async fn to_image_tools() -> Redirect {
    Page::Images.redirect()
}
