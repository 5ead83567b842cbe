//! One-page SVG run report
//!
//! Renders everything a reviewer needs to judge a run on a single page:
//!
//! - PCA and t-SNE scatter plots colored by cluster assignment
//! - Per-feature cluster-separation scores
//! - Raw-scale cluster means, one small panel per feature
//! - Service-by-label count tables for all three labeling strategies
//! - Run metadata footer (run id, version, seed, row counts)
//!
//! The report is a sink: it consumes [`ClusteringOutput`] and
//! [`ReportArtifacts`] and feeds nothing back into labeling.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::PipelineError;
use crate::types::{ClusteringOutput, CrossTab, FeatureClusterMeans, ReportArtifacts};

/// Report page width in pixels
const REPORT_WIDTH: u32 = 1600;

/// Report page height in pixels
const REPORT_HEIGHT: u32 = 1200;

/// Page title
const REPORT_TITLE: &str = "Ad Plan Inference - Clustering & Heuristics Summary";

/// Fill colors for cluster 0 and cluster 1
const CLUSTER_COLORS: [RGBColor; 2] = [RGBColor(68, 114, 196), RGBColor(237, 125, 49)];

/// Fill color for the separation-score bars
const SCORE_COLOR: RGBColor = RGBColor(100, 165, 173);

fn draw_err<E: std::fmt::Display>(err: E) -> PipelineError {
    PipelineError::Render(err.to_string())
}

/// Render the one-page report for a completed run.
///
/// `clustering` supplies the 2-D projections and assignments for the
/// scatter plots; `artifacts` supplies everything else. The file at
/// `path` is created or overwritten.
pub fn render_report(
    path: &Path,
    clustering: &ClusteringOutput,
    artifacts: &ReportArtifacts,
) -> Result<(), PipelineError> {
    let root = SVGBackend::new(path, (REPORT_WIDTH, REPORT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let (header, rest) = root.split_vertically(56);
    draw_header(&header, artifacts)?;

    let (charts, bottom) = rest.split_vertically(700);
    let (scatter_row, analysis_row) = charts.split_vertically(350);

    let (pca_area, tsne_area) = scatter_row.split_horizontally(800);
    draw_scatter(&pca_area, "PCA projection", &clustering.pca, clustering, artifacts)?;
    draw_scatter(&tsne_area, "t-SNE projection", &clustering.tsne, clustering, artifacts)?;

    let (importance_area, means_area) = analysis_row.split_horizontally(640);
    draw_importance(&importance_area, artifacts)?;
    let panels = means_area.split_evenly((2, 4));
    for (panel, means) in panels.iter().zip(&artifacts.cluster_means) {
        draw_mean_panel(panel, means)?;
    }

    let (tables_area, footer) = bottom.split_vertically(384);
    let table_cells = tables_area.split_evenly((1, 3));
    for (cell, tab) in table_cells.iter().zip(&artifacts.cross_tabs) {
        draw_cross_tab(cell, tab)?;
    }
    draw_footer(&footer, artifacts)?;

    root.present().map_err(draw_err)?;
    Ok(())
}

fn draw_header(
    area: &DrawingArea<SVGBackend, Shift>,
    artifacts: &ReportArtifacts,
) -> Result<(), PipelineError> {
    area.draw(&Text::new(
        REPORT_TITLE,
        (24, 14),
        ("sans-serif", 26).into_font().color(&BLACK),
    ))
    .map_err(draw_err)?;
    area.draw(&Text::new(
        format!(
            "generated {}",
            artifacts.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        (1330, 24),
        ("sans-serif", 13).into_font().color(&BLACK),
    ))
    .map_err(draw_err)?;
    Ok(())
}

/// One scatter plot of 2-D projected accounts, one series per cluster.
fn draw_scatter(
    area: &DrawingArea<SVGBackend, Shift>,
    caption: &str,
    points: &[(f64, f64)],
    clustering: &ClusteringOutput,
    artifacts: &ReportArtifacts,
) -> Result<(), PipelineError> {
    let x_range = padded_range(points.iter().map(|p| p.0));
    let y_range = padded_range(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(28)
        .y_label_area_size(46)
        .build_cartesian_2d(x_range, y_range)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_labels(6)
        .y_labels(6)
        .label_style(("sans-serif", 11))
        .draw()
        .map_err(draw_err)?;

    for cluster_id in 0..CLUSTER_COLORS.len() {
        let color = CLUSTER_COLORS[cluster_id];
        let cluster_points: Vec<(f64, f64)> = points
            .iter()
            .zip(&clustering.assignments)
            .filter(|(_, &assigned)| assigned == cluster_id)
            .map(|(&p, _)| p)
            .collect();
        let role = if cluster_id == artifacts.ad_supported_cluster {
            "ad-supported"
        } else {
            "ad-free"
        };
        chart
            .draw_series(
                cluster_points
                    .into_iter()
                    .map(|(x, y)| Circle::new((x, y), 3, color.filled())),
            )
            .map_err(draw_err)?
            .label(format!("cluster {cluster_id} ({role})"))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .label_font(("sans-serif", 13))
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

/// Horizontal bar chart of cluster-separation scores, best feature on top.
fn draw_importance(
    area: &DrawingArea<SVGBackend, Shift>,
    artifacts: &ReportArtifacts,
) -> Result<(), PipelineError> {
    let n = artifacts.importance.len();
    let max_score = artifacts
        .importance
        .iter()
        .map(|imp| imp.score)
        .fold(0.0f64, f64::max)
        .max(1e-6);

    let mut chart = ChartBuilder::on(area)
        .caption("Feature separation between clusters", ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(30)
        .y_label_area_size(8)
        .build_cartesian_2d(0.0..max_score * 1.25, 0.0..n as f64)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_labels(5)
        .x_desc("cluster separation score")
        .label_style(("sans-serif", 11))
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(artifacts.importance.iter().enumerate().map(|(rank, imp)| {
            let y = (n - 1 - rank) as f64;
            Rectangle::new([(0.0, y + 0.18), (imp.score, y + 0.82)], SCORE_COLOR.filled())
        }))
        .map_err(draw_err)?;

    let label_style = ("sans-serif", 12).into_font().color(&BLACK);
    chart
        .draw_series(artifacts.importance.iter().enumerate().map(|(rank, imp)| {
            let y = (n - 1 - rank) as f64;
            Text::new(
                format!("{} ({:.3})", imp.feature, imp.score),
                (max_score * 0.02, y + 0.68),
                label_style.clone(),
            )
        }))
        .map_err(draw_err)?;
    Ok(())
}

/// Two bars comparing the raw cluster means of a single feature.
fn draw_mean_panel(
    area: &DrawingArea<SVGBackend, Shift>,
    means: &FeatureClusterMeans,
) -> Result<(), PipelineError> {
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (width as i32, height as i32);
    let title_style = ("sans-serif", 13).into_font().color(&BLACK);
    let small_style = ("sans-serif", 11).into_font().color(&BLACK);

    area.draw(&Text::new(means.feature.clone(), (8, 6), title_style))
        .map_err(draw_err)?;

    let baseline = height - 24;
    let max_bar_px = (baseline - 48).max(1);
    let top = means.cluster0_mean.max(means.cluster1_mean).max(1e-9);

    area.draw(&PathElement::new(
        vec![(12, baseline), (width - 12, baseline)],
        BLACK,
    ))
    .map_err(draw_err)?;

    let values = [means.cluster0_mean, means.cluster1_mean];
    for (cluster_id, value) in values.iter().enumerate() {
        let bar_height = ((value / top) * max_bar_px as f64).round() as i32;
        let x0 = width / 2 - 44 + cluster_id as i32 * 54;
        area.draw(&Rectangle::new(
            [(x0, baseline - bar_height), (x0 + 34, baseline)],
            CLUSTER_COLORS[cluster_id].filled(),
        ))
        .map_err(draw_err)?;
        area.draw(&Text::new(
            format!("{value:.2}"),
            (x0, baseline - bar_height - 15),
            small_style.clone(),
        ))
        .map_err(draw_err)?;
        area.draw(&Text::new(
            format!("c{cluster_id}"),
            (x0 + 11, baseline + 6),
            small_style.clone(),
        ))
        .map_err(draw_err)?;
    }
    Ok(())
}

/// One label-by-service count table, labels as rows so wide hybrid
/// label names stay readable.
fn draw_cross_tab(
    area: &DrawingArea<SVGBackend, Shift>,
    tab: &CrossTab,
) -> Result<(), PipelineError> {
    let title_style = ("sans-serif", 15).into_font().color(&BLACK);
    let cell_style = ("monospace", 13).into_font().color(&BLACK);

    area.draw(&Text::new(tab.title.clone(), (10, 10), title_style))
        .map_err(draw_err)?;

    let mut y = 40;
    let mut header = format!("{:<26}", "label");
    for service in &tab.services {
        header.push_str(&format!("{service:>10}"));
    }
    area.draw(&Text::new(header, (10, y), cell_style.clone()))
        .map_err(draw_err)?;
    y += 20;

    for (column_idx, column) in tab.columns.iter().enumerate() {
        let mut line = format!("{column:<26}");
        for service_counts in &tab.counts {
            line.push_str(&format!("{:>10}", service_counts[column_idx]));
        }
        area.draw(&Text::new(line, (10, y), cell_style.clone()))
            .map_err(draw_err)?;
        y += 20;
    }
    Ok(())
}

fn draw_footer(
    area: &DrawingArea<SVGBackend, Shift>,
    artifacts: &ReportArtifacts,
) -> Result<(), PipelineError> {
    let style = ("sans-serif", 13).into_font().color(&BLACK);
    area.draw(&Text::new(
        format!(
            "run {} | planscope v{} | seed {}",
            artifacts.run_id, artifacts.pipeline_version, artifacts.seed
        ),
        (24, 8),
        style.clone(),
    ))
    .map_err(draw_err)?;
    area.draw(&Text::new(
        format!(
            "{} sessions ingested, {} augmented | {} accounts labeled \
             ({} heuristic-only, {} cluster-only dropped in join) | \
             ad-supported cluster: {} | cluster sizes [{}, {}]",
            artifacts.sessions_ingested,
            artifacts.sessions_augmented,
            artifacts.accounts_joined,
            artifacts.dropped_heuristic_only,
            artifacts.dropped_cluster_only,
            artifacts.ad_supported_cluster,
            artifacts.cluster_sizes[0],
            artifacts.cluster_sizes[1],
        ),
        (24, 30),
        style,
    ))
    .map_err(draw_err)?;
    Ok(())
}

/// Axis range covering `values` with a small margin; degenerate inputs
/// fall back to a unit range so chart construction never fails.
fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return -1.0..1.0;
    }
    let pad = ((hi - lo) * 0.08).max(1e-6);
    (lo - pad)..(hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use crate::types::{AccountFeatures, FeatureImportance};
    use chrono::Utc;
    use tempfile::tempdir;

    fn make_features(account_id: &str) -> AccountFeatures {
        AccountFeatures {
            account_id: account_id.to_string(),
            service: "Netflix".to_string(),
            total_sessions: 10,
            avg_session_duration: 40.0,
            std_session_duration: 4.0,
            gap_session_ratio: 0.5,
            gap_eligible_ratio: 0.5,
            avg_gap_length: 1.2,
            sessions_with_gap: 5,
            sessions_with_gap_eligible: 5,
        }
    }

    fn make_inputs() -> (ClusteringOutput, ReportArtifacts) {
        let clustering = ClusteringOutput {
            features: (0..4).map(|i| make_features(&format!("tv-{i}"))).collect(),
            assignments: vec![0, 0, 1, 1],
            cluster_sizes: [2, 2],
            pca: vec![(-1.0, 0.5), (-0.8, 0.3), (1.1, -0.4), (0.9, -0.6)],
            tsne: vec![(-4.0, 2.0), (-3.5, 1.8), (4.2, -2.1), (3.9, -1.7)],
            importance: Vec::new(),
        };
        let importance: Vec<FeatureImportance> = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| FeatureImportance {
                feature: name.to_string(),
                score: 2.0 - i as f64 * 0.2,
            })
            .collect();
        let cluster_means: Vec<FeatureClusterMeans> = FEATURE_NAMES
            .iter()
            .map(|name| FeatureClusterMeans {
                feature: name.to_string(),
                cluster0_mean: 1.0,
                cluster1_mean: 3.0,
            })
            .collect();
        let tab = CrossTab {
            title: "Heuristic label by service".to_string(),
            services: vec!["Hulu".to_string(), "Netflix".to_string()],
            columns: vec!["ad-free".to_string(), "ad-supported".to_string()],
            counts: vec![vec![1, 1], vec![0, 2]],
        };
        let artifacts = ReportArtifacts {
            run_id: "run-test".to_string(),
            pipeline_version: "0.1.0".to_string(),
            generated_at: Utc::now(),
            seed: 42,
            sessions_ingested: 40,
            sessions_augmented: 38,
            accounts_joined: 4,
            dropped_heuristic_only: 0,
            dropped_cluster_only: 0,
            ad_supported_cluster: 1,
            cluster_sizes: [2, 2],
            importance,
            cluster_means,
            cross_tabs: vec![tab.clone(), tab.clone(), tab],
        };
        (clustering, artifacts)
    }

    #[test]
    fn test_report_renders_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.svg");
        let (clustering, artifacts) = make_inputs();

        render_report(&path, &clustering, &artifacts).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
        assert!(svg.contains("Ad Plan Inference"));
        assert!(svg.contains("PCA projection"));
        assert!(svg.contains("t-SNE projection"));
    }

    #[test]
    fn test_report_labels_ad_supported_cluster() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.svg");
        let (clustering, artifacts) = make_inputs();

        render_report(&path, &clustering, &artifacts).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("cluster 1 (ad-supported)"));
        assert!(svg.contains("cluster 0 (ad-free)"));
        assert!(svg.contains("gap_session_ratio"));
        assert!(svg.contains("run-test"));
    }
}
