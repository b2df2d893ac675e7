//! HTML views, embedded into the binary at build time.

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use tera::Tera;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct TemplateAssets;

pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn load() -> Result<Self> {
        let mut sources = Vec::new();
        for name in TemplateAssets::iter() {
            let file = TemplateAssets::get(&name)
                .with_context(|| format!("Embedded template vanished: {name}"))?;
            let body = String::from_utf8(file.data.into_owned())
                .with_context(|| format!("Template is not UTF-8: {name}"))?;
            sources.push((name.into_owned(), body));
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(sources)
            .context("Failed to compile templates")?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, ctx: &tera::Context) -> Result<String> {
        self.tera
            .render(name, ctx)
            .with_context(|| format!("Failed to render {name}"))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tera.get_template_names()
    }
}
