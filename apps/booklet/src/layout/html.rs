//! HTML template for a layout description.
//!
//! Right-to-left body, running page number in the top margin (suppressed on the first
//! page), one CSS class per commentary source. The sheet size and margins go into the
//! `@page` rule so the print backend needs no extra flags.

use quick_xml::escape::escape;

use crate::layout::assembler::{LayoutBlock, LayoutDescription, LayoutSection};
use crate::layout::style::{display_name, StyleTable};
use crate::render::RenderSettings;

/// CSS class for a commentary source: `Rashi_on_Berakhot` → `commentary-Rashi-on-Berakhot`.
pub fn source_class(source_name: &str) -> String {
    let safe: String = source_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("commentary-{safe}")
}

/// Renders the complete HTML document.
pub fn render_html(
    layout: &LayoutDescription,
    styles: &StyleTable,
    settings: &RenderSettings,
) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    html.push_str(&stylesheet(layout, styles, settings));
    html.push_str("</style>\n</head>\n<body>\n");

    if let Some(cover) = &layout.cover {
        html.push_str(&format!(
            "<div class=\"cover\">\n  <h1 dir=\"rtl\">{}</h1>\n</div>\n",
            escape(cover.as_str())
        ));
    }

    for section in &layout.sections {
        render_section(&mut html, section, layout.paged);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_section(html: &mut String, section: &LayoutSection, paged: bool) {
    if section.leading_blank {
        html.push_str("<div class=\"blank-page\"></div>\n");
    }
    html.push_str("<div class=\"source-page\">\n");
    if !paged {
        html.push_str(&format!(
            "  <div class=\"page-header\">{}</div>\n",
            escape(section.header.as_str())
        ));
    }

    for block in &section.blocks {
        let block_class = if paged {
            "content-block page-block"
        } else {
            "content-block"
        };
        html.push_str(&format!("  <div class=\"{block_class}\">\n"));
        if paged {
            html.push_str(&format!(
                "    <div class=\"page-header\">{} [{}]</div>\n",
                escape(section.header.as_str()),
                escape(block.caption())
            ));
        }
        match block {
            LayoutBlock::Grouped {
                segments, groups, ..
            } => {
                html.push_str("    <div class=\"primary-section\">\n");
                for seg in segments {
                    html.push_str(&format!(
                        "      <div class=\"segment\"><b>[{}]</b> {}</div>\n",
                        seg.position,
                        escape(seg.text.as_str())
                    ));
                }
                html.push_str("    </div>\n");

                if !groups.is_empty() {
                    html.push_str("    <div class=\"commentary-section\">\n");
                    for group in groups {
                        html.push_str(&format!(
                            "      <div class=\"commentary-type-group {}\">\n",
                            source_class(&group.source_name)
                        ));
                        html.push_str(&format!(
                            "        <div class=\"commentary-type-header\">{}:</div>\n",
                            escape(display_name(&group.source_name).as_str())
                        ));
                        for item in &group.items {
                            html.push_str(&format!(
                                "        <div class=\"commentary-item\"><b>[{}]</b> {}</div>\n",
                                item.position,
                                escape(item.text.as_str())
                            ));
                        }
                        html.push_str("      </div>\n");
                    }
                    html.push_str("    </div>\n");
                }
            }
            LayoutBlock::Inline { segments, .. } => {
                for seg in segments {
                    html.push_str("    <div class=\"segment-block\">\n");
                    html.push_str(&format!(
                        "      <div class=\"segment\">{}</div>\n",
                        escape(seg.text.as_str())
                    ));
                    for entry in &seg.commentaries {
                        html.push_str(&format!(
                            "      <div class=\"commentary {}\">{}</div>\n",
                            source_class(&entry.source_name),
                            escape(entry.text.as_str())
                        ));
                    }
                    html.push_str("    </div>\n");
                }
            }
        }
        html.push_str("  </div>\n");
    }
    html.push_str("</div>\n");
}

fn stylesheet(
    layout: &LayoutDescription,
    styles: &StyleTable,
    settings: &RenderSettings,
) -> String {
    let size = settings.font_size;
    let font_face = settings.font_path.as_ref().map_or_else(String::new, |path| {
        format!(
            "  @font-face {{\n    font-family: 'HebrewFont';\n    src: url('file://{}');\n  }}\n",
            path.display()
        )
    });

    let mut css = format!(
        r#"{font_face}  @page {{
    size: {page_size};
    margin: {margins};
    @top-center {{
      content: "- " counter(page) " -";
      font-family: 'HebrewFont', 'Noto Sans Hebrew', sans-serif;
      font-size: {header_size}pt;
      direction: ltr;
    }}
  }}
  @page :first {{
    @top-center {{ content: none; }}
  }}
  body {{
    font-family: 'HebrewFont', 'Noto Sans Hebrew', sans-serif;
    direction: rtl;
    unicode-bidi: plaintext;
    font-size: {size}pt;
    line-height: 1.4;
    margin: 0;
    padding: 0;
  }}
  .cover {{
    display: flex;
    align-items: center;
    justify-content: center;
    font-size: {cover_size}pt;
    min-height: 100vh;
    page-break-after: always;
  }}
  .blank-page {{ page-break-after: always; height: 1px; }}
  .page-header {{
    direction: ltr;
    text-align: left;
    margin-bottom: 6px;
    font-size: {caption_size}pt;
    font-weight: bold;
    page-break-after: avoid;
  }}
  .content-block {{ page-break-inside: avoid; margin-bottom: 8px; }}
  .primary-section {{ margin-bottom: 6px; }}
  .segment-block {{ page-break-inside: avoid; margin-bottom: 6px; }}
  .segment {{ margin-bottom: 3px; text-align: justify; text-align-last: right; }}
  .commentary-section {{ margin-top: 4px; padding-top: 4px; border-top: 1px solid #ddd; }}
  .commentary-type-group {{ margin-bottom: 5px; }}
  .commentary-type-header {{ font-size: {caption_size}pt; font-weight: bold; margin: 3px 0; }}
  .commentary-item {{ margin-bottom: 2px; }}
  .commentary {{ text-align: justify; text-align-last: right; }}
"#,
        page_size = settings.page_format.css_size(),
        margins = settings.margins,
        header_size = size.saturating_sub(2),
        cover_size = size + 4,
        caption_size = size.saturating_sub(1),
    );

    if layout.paged {
        css.push_str("  .page-block { page-break-before: always; }\n");
    }

    for (name, style) in styles.iter() {
        css.push_str(&format!(
            "  .{} {{ font-size: {}pt; color: {}; margin: 2px 10px 2px 0; }}\n",
            source_class(name),
            style.font_size,
            style.color
        ));
    }
    css
}
