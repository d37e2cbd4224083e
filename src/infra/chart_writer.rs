use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::app::ports::ChartRendererPort;
use crate::charts::ChartSpec;
use crate::constants::PLOTLY_CDN;
use crate::error::Result;

/// Writes each chart as a standalone HTML page that draws the figure with plotly.js.
pub struct HtmlChartWriter {
    output_dir: PathBuf,
}

impl HtmlChartWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn page(chart: &ChartSpec) -> Result<String> {
        // "</" inside an inline script would end the element early.
        let figure = serde_json::to_string(&chart.figure)?.replace("</", "<\\/");
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="chart"></div>
<script>
const figure = {figure};
Plotly.newPlot("chart", figure.data, figure.layout);
</script>
</body>
</html>
"#,
            title = escape_html(&chart.title),
            cdn = PLOTLY_CDN,
            figure = figure,
        ))
    }
}

impl ChartRendererPort for HtmlChartWriter {
    fn render(&self, chart: &ChartSpec) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.html", chart.id));
        fs::write(&path, Self::page(chart)?)?;
        debug!(path = %path.display(), "Wrote chart");
        Ok(path)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
