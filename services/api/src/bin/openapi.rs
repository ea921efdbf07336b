//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the REST API to disk, by default `openapi.json`.
//! An optional first argument overrides the output path.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    let doc = ApiDoc::openapi();
    std::fs::write(&path, doc.to_pretty_json()?)?;
    println!(
        "OpenAPI document for {} ({} paths) written to {}",
        doc.info.title,
        doc.paths.paths.len(),
        path
    );
    Ok(())
}
