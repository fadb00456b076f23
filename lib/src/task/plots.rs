use std::{ops::Range, path::Path, sync::OnceLock};

use itertools::{Itertools, MinMaxResult};
use plotters::{
  coord::Shift,
  prelude::*,
  style::{register_font, FontStyle},
};
use tracing::{debug, instrument};

use super::{ExperimentResult, Split, SplitResult};
use crate::{
  data::is_class_one,
  error::{Result, RingError},
};

const FIGURE_SIZE: (u32, u32) = (800, 600);
const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] =
  include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/DejaVuSans.ttf"));

static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;
type Figure<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Renders every figure of a run.
///
/// Files are only written when `plots_dir` is given; otherwise each figure is
/// drawn into a throwaway buffer. Missing dev and test results are skipped.
#[instrument(skip(results))]
pub fn plot_results(
  results: &ExperimentResult,
  plots_dir: Option<&Path>,
  extension: &str,
) -> Result<()> {
  register_fonts()?;
  let dest = |name: &str| plots_dir.map(|dir| dir.join(format!("{name}.{extension}")));

  for (split, result) in results.splits() {
    let label = split.label();
    with_figure(dest(&format!("{label}_output")).as_deref(), |root| {
      plot_output(root, split, result)
    })?;
    with_figure(dest(&format!("{label}_perceptron")).as_deref(), |root| {
      plot_perceptron(root, split, result)
    })?;
  }
  with_figure(dest("training_profile").as_deref(), |root| {
    plot_training_profile(root, results)
  })?;
  with_figure(dest("input").as_deref(), |root| plot_inputs(root, results))?;

  if let Some(dir) = plots_dir {
    debug!("figures saved to {}", dir.display());
  }
  Ok(())
}

/// Makes the bundled font available to every caption, label and legend.
fn register_fonts() -> Result<()> {
  let registered = *FONT_REGISTERED
    .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
  if registered {
    Ok(())
  } else {
    Err(RingError::Plot("the bundled font is not a valid TrueType file".to_string()))
  }
}

/// Draws one figure and releases it before returning, whether drawing failed or not.
fn with_figure<F>(path: Option<&Path>, draw: F) -> Result<()>
where
  F: FnOnce(&Figure<'_>) -> DrawResult,
{
  let outcome = match path {
    Some(path) => {
      let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
      render(&root, draw)
    }
    None => {
      let mut buffer = vec![0u8; (FIGURE_SIZE.0 * FIGURE_SIZE.1 * 3) as usize];
      let root = BitMapBackend::with_buffer(&mut buffer, FIGURE_SIZE).into_drawing_area();
      render(&root, draw)
    }
  };
  outcome.map_err(|e| {
    let target = path.map_or_else(|| "buffer".to_string(), |p| p.display().to_string());
    RingError::Plot(format!("{target}: {e}"))
  })
}

fn render<F>(root: &Figure<'_>, draw: F) -> DrawResult
where
  F: FnOnce(&Figure<'_>) -> DrawResult,
{
  root.fill(&WHITE)?;
  draw(root)?;
  root.present()?;
  Ok(())
}

/// Axis range covering all finite `values` with a small margin.
fn padded_range(values: impl IntoIterator<Item = f32>) -> Range<f32> {
  match values.into_iter().filter(|v| v.is_finite()).minmax() {
    MinMaxResult::NoElements => -1.0..1.0,
    MinMaxResult::OneElement(v) => (v - 1.0)..(v + 1.0),
    MinMaxResult::MinMax(lo, hi) => {
      let pad = ((hi - lo) * 0.05).max(1e-3);
      (lo - pad)..(hi + pad)
    }
  }
}

fn index_range(len: usize) -> Range<f32> {
  0.0..(len.max(1) as f32)
}

fn class_color(split: Split, class_one: bool) -> RGBColor {
  let (class_zero, class_one_color) = split.colors();
  if class_one {
    class_one_color
  } else {
    class_zero
  }
}

fn plot_output(root: &Figure<'_>, split: Split, result: &SplitResult) -> DrawResult {
  let caption = format!(
    "{} output: performance {:.4}, accuracy {:.2}%",
    split.label(),
    result.performance,
    result.accuracy.accuracy_value * 100.0
  );
  let mut chart = ChartBuilder::on(root)
    .caption(caption, (FONT_FAMILY, 20))
    .margin(10)
    .x_label_area_size(30)
    .y_label_area_size(50)
    .build_cartesian_2d(
      index_range(result.len()),
      padded_range(result.best_output.iter().copied()),
    )?;
  chart.configure_mesh().x_desc("sample").y_desc("output").draw()?;

  let (zero, one) = split.colors();
  chart.draw_series(LineSeries::new(
    result.best_output.iter().enumerate().map(|(i, &o)| (i as f32, o)),
    zero.mix(0.4),
  ))?;
  chart.draw_series(
    result
      .best_output
      .iter()
      .zip(&result.targets)
      .enumerate()
      .map(|(i, (&o, t))| {
        Circle::new(
          (i as f32, o),
          2,
          class_color(split, is_class_one(t)).filled(),
        )
      }),
  )?;
  // class boundary of the sorted targets
  let boundary = result.targets.iter().position(is_class_one);
  if let Some(b) = boundary {
    let y = padded_range(result.best_output.iter().copied());
    chart.draw_series(LineSeries::new(
      vec![(b as f32, y.start), (b as f32, y.end)],
      one.stroke_width(1),
    ))?;
  }
  Ok(())
}

fn plot_perceptron(root: &Figure<'_>, split: Split, result: &SplitResult) -> DrawResult {
  let accuracy = &result.accuracy;
  let caption = format!(
    "{} perceptron: accuracy {:.2}%, threshold {:.4}",
    split.label(),
    accuracy.accuracy_value * 100.0,
    accuracy.threshold
  );
  let x_range = index_range(result.len());
  let mut chart = ChartBuilder::on(root)
    .caption(caption, (FONT_FAMILY, 20))
    .margin(10)
    .x_label_area_size(30)
    .y_label_area_size(50)
    .build_cartesian_2d(
      x_range.clone(),
      padded_range(
        result
          .best_output
          .iter()
          .copied()
          .chain(std::iter::once(accuracy.threshold)),
      ),
    )?;
  chart.configure_mesh().x_desc("sample").y_desc("output").draw()?;

  for class_one in [false, true] {
    let color = class_color(split, class_one);
    chart
      .draw_series(
        result
          .best_output
          .iter()
          .zip(&result.targets)
          .enumerate()
          .filter(|(_, (_, t))| is_class_one(t) == class_one)
          .map(|(i, (&o, _))| Circle::new((i as f32, o), 3, color.filled())),
      )?
      .label(if class_one { "class 1" } else { "class 0" })
      .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
  }
  chart
    .draw_series(LineSeries::new(
      vec![
        (x_range.start, accuracy.threshold),
        (x_range.end, accuracy.threshold),
      ],
      BLACK.stroke_width(2),
    ))?
    .label("threshold")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
  chart
    .configure_series_labels()
    .background_style(WHITE.mix(0.8))
    .border_style(BLACK)
    .draw()?;
  Ok(())
}

fn plot_training_profile(root: &Figure<'_>, results: &ExperimentResult) -> DrawResult {
  let histories: Vec<(Split, &Vec<f32>)> = results
    .splits()
    .filter_map(|(split, r)| r.performance_history.as_ref().map(|h| (split, h)))
    .collect();
  let epochs = histories.iter().map(|(_, h)| h.len()).max().unwrap_or(0);

  let mut chart = ChartBuilder::on(root)
    .caption("Training profile", (FONT_FAMILY, 20))
    .margin(10)
    .x_label_area_size(30)
    .y_label_area_size(50)
    .build_cartesian_2d(
      index_range(epochs),
      padded_range(histories.iter().flat_map(|(_, h)| h.iter().copied())),
    )?;
  chart.configure_mesh().x_desc("epoch").y_desc("loss").draw()?;

  for (split, history) in histories {
    let (color, _) = split.colors();
    chart
      .draw_series(LineSeries::new(
        history.iter().enumerate().map(|(i, &l)| (i as f32, l)),
        color.stroke_width(2),
      ))?
      .label(split.label())
      .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
  }
  chart
    .configure_series_labels()
    .background_style(WHITE.mix(0.8))
    .border_style(BLACK)
    .draw()?;
  Ok(())
}

fn plot_inputs(root: &Figure<'_>, results: &ExperimentResult) -> DrawResult {
  let all_inputs = || results.splits().flat_map(|(_, r)| r.inputs.iter());
  let mut chart = ChartBuilder::on(root)
    .caption(format!("Input data (gap {})", results.gap), (FONT_FAMILY, 20))
    .margin(10)
    .x_label_area_size(30)
    .y_label_area_size(50)
    .build_cartesian_2d(
      padded_range(all_inputs().map(|x| x[0])),
      padded_range(all_inputs().map(|x| x[1])),
    )?;
  chart.configure_mesh().x_desc("x0").y_desc("x1").draw()?;

  for (split, result) in results.splits() {
    for class_one in [false, true] {
      let color = class_color(split, class_one);
      chart
        .draw_series(
          result
            .inputs
            .iter()
            .zip(&result.targets)
            .filter(|(_, t)| is_class_one(t) == class_one)
            .map(|(x, _)| Circle::new((x[0], x[1]), 2, color.filled())),
        )?
        .label(format!("{} class {}", split.label(), u8::from(class_one)))
        .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
    }
  }
  chart
    .configure_series_labels()
    .background_style(WHITE.mix(0.8))
    .border_style(BLACK)
    .draw()?;
  Ok(())
}
