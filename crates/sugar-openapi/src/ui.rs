//! HTML shells for interactive API documentation.
//!
//! Both pages load their JavaScript from a CDN and point it at the served
//! OpenAPI document; nothing here renders the document itself.

/// Default Swagger UI bundle.
pub const SWAGGER_JS_URL: &str = "https://cdn.jsdelivr.net/npm/swagger-ui-dist@3/swagger-ui-bundle.js";
/// Default Swagger UI stylesheet.
pub const SWAGGER_CSS_URL: &str = "https://cdn.jsdelivr.net/npm/swagger-ui-dist@3/swagger-ui.css";
/// Default ReDoc bundle.
pub const REDOC_JS_URL: &str =
    "https://cdn.jsdelivr.net/npm/redoc@next/bundles/redoc.standalone.js";

/// Render the Swagger UI page.
#[must_use]
pub fn swagger_html(title: &str, openapi_url: &str, js_url: &str, css_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <link type="text/css" rel="stylesheet" href="{css}">
    <title>{title}</title>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="{js}"></script>
    <script>
        const ui = SwaggerUIBundle({{
            url: "{url}",
            dom_id: '#swagger-ui',
            presets: [
                SwaggerUIBundle.presets.apis,
                SwaggerUIBundle.SwaggerUIStandalonePreset
            ],
            layout: "BaseLayout",
            deepLinking: true,
            showExtensions: true,
            showCommonExtensions: true
        }})
    </script>
</body>
</html>
"#,
        css = escape(css_url),
        title = escape(title),
        js = escape(js_url),
        url = escape(openapi_url),
    )
}

/// Render the ReDoc page.
#[must_use]
pub fn redoc_html(title: &str, openapi_url: &str, js_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body {{
            margin: 0;
            padding: 0;
        }}
    </style>
</head>
<body>
    <redoc spec-url="{url}"></redoc>
    <script src="{js}"></script>
</body>
</html>
"#,
        title = escape(title),
        url = escape(openapi_url),
        js = escape(js_url),
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swagger_page_points_at_document() {
        let html = swagger_html("Sugar Swagger", "/openapi.json", SWAGGER_JS_URL, SWAGGER_CSS_URL);
        assert!(html.contains(r#"url: "/openapi.json""#));
        assert!(html.contains("<title>Sugar Swagger</title>"));
        assert!(html.contains(SWAGGER_JS_URL));
        assert!(html.contains(SWAGGER_CSS_URL));
    }

    #[test]
    fn test_redoc_page_points_at_document() {
        let html = redoc_html("Sugar Redoc", "/api/openapi.json", REDOC_JS_URL);
        assert!(html.contains(r#"<redoc spec-url="/api/openapi.json"></redoc>"#));
        assert!(html.contains(REDOC_JS_URL));
    }

    #[test]
    fn test_title_is_escaped() {
        let html = redoc_html("<script>", "/openapi.json", REDOC_JS_URL);
        assert!(html.contains("<title>&lt;script&gt;</title>"));
    }
}
