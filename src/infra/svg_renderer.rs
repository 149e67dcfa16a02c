use crate::app::ports::RendererPort;
use crate::constants::{CHART_IMAGE_FILENAME, QUOTE_IMAGE_FILENAME};
use crate::types::{AgeBand, AgeBandStats, ImageBuffer, QuoteTable};
use anyhow::bail;
use std::f64::consts::PI;
use std::fmt::Write;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";
const SLICE_COLORS: [&str; 3] = ["#4e79a7", "#f28e2b", "#e15759"];

/// Renders quote tables and age distribution charts as standalone SVG documents
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    pub cell_width: u32,
    pub row_height: u32,
    pub chart_radius: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            cell_width: 140,
            row_height: 36,
            chart_radius: 120,
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl SvgRenderer {
    fn quote_svg(&self, table: &QuoteTable) -> anyhow::Result<String> {
        let headers = ["Age Band", "Small", "Significant", "Major"];
        let width = self.cell_width * headers.len() as u32;
        let height = self.row_height * (table.rows.len() as u32 + 1);

        let mut svg = String::new();
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" font-family="sans-serif" font-size="14">"#
        )?;
        writeln!(svg, r##"<rect width="{width}" height="{}" fill="#2f4b7c"/>"##, self.row_height)?;
        for (col, header) in headers.iter().enumerate() {
            self.cell(&mut svg, col, 0, header, "#ffffff")?;
        }
        for (i, row) in table.rows.iter().enumerate() {
            let y = self.row_height * (i as u32 + 1);
            let fill = if i % 2 == 0 { "#f4f6f8" } else { "#ffffff" };
            writeln!(svg, r#"<rect y="{y}" width="{width}" height="{}" fill="{fill}"/>"#, self.row_height)?;
            let values = [
                row.label.as_str(),
                row.small.as_str(),
                row.significant.as_str(),
                row.major.as_str(),
            ];
            for (col, value) in values.iter().enumerate() {
                self.cell(&mut svg, col, i + 1, value, "#222222")?;
            }
        }
        svg.push_str("</svg>\n");
        Ok(svg)
    }

    fn cell(&self, svg: &mut String, col: usize, row: usize, text: &str, color: &str) -> std::fmt::Result {
        let x = self.cell_width * col as u32 + self.cell_width / 2;
        let y = self.row_height * row as u32 + self.row_height * 2 / 3;
        writeln!(
            svg,
            r#"<text x="{x}" y="{y}" fill="{color}" text-anchor="middle">{}</text>"#,
            escape(text)
        )
    }

    fn chart_svg(&self, stats: &AgeBandStats) -> anyhow::Result<String> {
        let r = self.chart_radius as f64;
        let (cx, cy) = (r + 20.0, r + 20.0);
        let width = (cx * 2.0 + 160.0) as u32;
        let height = (cy * 2.0) as u32;

        let mut svg = String::new();
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" font-family="sans-serif" font-size="14">"#
        )?;

        let mut start = -PI / 2.0;
        for (i, band) in AgeBand::ALL.iter().enumerate() {
            let fraction = stats.fraction(*band);
            let color = SLICE_COLORS[i];
            if fraction >= 1.0 - 1e-9 {
                writeln!(svg, r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{color}"/>"#)?;
            } else if fraction > 0.0 {
                let end = start + fraction * 2.0 * PI;
                let (x0, y0) = (cx + r * start.cos(), cy + r * start.sin());
                let (x1, y1) = (cx + r * end.cos(), cy + r * end.sin());
                let large = if fraction > 0.5 { 1 } else { 0 };
                writeln!(
                    svg,
                    r#"<path d="M {cx:.2} {cy:.2} L {x0:.2} {y0:.2} A {r:.2} {r:.2} 0 {large} 1 {x1:.2} {y1:.2} Z" fill="{color}"/>"#
                )?;
                start = end;
            }

            let ly = 30.0 + i as f64 * 24.0;
            let lx = cx * 2.0 + 10.0;
            writeln!(svg, r#"<rect x="{lx:.0}" y="{:.0}" width="14" height="14" fill="{color}"/>"#, ly - 12.0)?;
            writeln!(
                svg,
                r#"<text x="{:.0}" y="{ly:.0}">{} ({:.1}%)</text>"#,
                lx + 20.0,
                escape(band.label()),
                fraction * 100.0
            )?;
        }
        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

impl RendererPort for SvgRenderer {
    fn render_quote_table(&self, table: &QuoteTable) -> anyhow::Result<ImageBuffer> {
        if table.rows.is_empty() {
            bail!("quote table has no rows to render");
        }
        Ok(ImageBuffer {
            filename: QUOTE_IMAGE_FILENAME.to_string(),
            content_type: SVG_CONTENT_TYPE.to_string(),
            bytes: self.quote_svg(table)?.into_bytes(),
        })
    }

    fn render_distribution_chart(&self, stats: &AgeBandStats) -> anyhow::Result<ImageBuffer> {
        let total = stats.band1 + stats.band2 + stats.band3;
        if (total - 1.0).abs() > 1e-6 {
            bail!("age band fractions sum to {total}, expected 1");
        }
        Ok(ImageBuffer {
            filename: CHART_IMAGE_FILENAME.to_string(),
            content_type: SVG_CONTENT_TYPE.to_string(),
            bytes: self.chart_svg(stats)?.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{multipliers_from_stats, quote_from_multipliers};

    fn stats(b1: f64, b2: f64, b3: f64) -> AgeBandStats {
        AgeBandStats {
            band1: b1,
            band2: b2,
            band3: b3,
        }
    }

    #[test]
    fn quote_image_contains_every_value() {
        let table = quote_from_multipliers(&multipliers_from_stats(&stats(0.5, 0.25, 0.25)));
        let image = SvgRenderer::default().render_quote_table(&table).unwrap();
        let svg = String::from_utf8(image.bytes).unwrap();
        assert_eq!(image.filename, QUOTE_IMAGE_FILENAME);
        assert!(svg.contains("&lt; 40"));
        for row in &table.rows {
            assert!(svg.contains(&row.small));
            assert!(svg.contains(&row.major));
        }
    }

    #[test]
    fn chart_draws_one_slice_per_populated_band() {
        let image = SvgRenderer::default()
            .render_distribution_chart(&stats(0.5, 0.5, 0.0))
            .unwrap();
        let svg = String::from_utf8(image.bytes).unwrap();
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("60+ (0.0%)"));
    }

    #[test]
    fn single_band_chart_is_a_full_circle() {
        let image = SvgRenderer::default()
            .render_distribution_chart(&stats(0.0, 1.0, 0.0))
            .unwrap();
        let svg = String::from_utf8(image.bytes).unwrap();
        assert!(svg.contains("<circle"));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn inconsistent_stats_are_rejected() {
        assert!(SvgRenderer::default()
            .render_distribution_chart(&stats(0.0, 0.0, 0.0))
            .is_err());
    }
}
