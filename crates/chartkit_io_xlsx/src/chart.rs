//! Scatter and bar chart construction over cell ranges.

use rust_xlsxwriter::{Chart, ChartLegendPosition, ChartType};

use crate::conf::N_IDX_CHART_STYLE_DEFAULT;
use crate::spec::{
    EnumChartSeriesShape, SpecBarChartOptions, SpecCellRange, SpecChartSeries,
    SpecScatterChartOptions,
};
use crate::util::{
    convert_cm_to_px, derive_axis_bounds, derive_range_formula, validate_cell_range,
};

////////////////////////////////////////////////////////////////////////////////
// #region SeriesPlanning

/// Flatten a series shape plus optional legend labels into a series plan.
///
/// When labels are present for a multi-series shape, series are paired with
/// labels zip-style and the plan length equals the number of pairs. Absent
/// labels plan every series unnamed. `Paired` zips xs with ys the same way.
pub fn plan_scatter_series(
    shape: &EnumChartSeriesShape,
    legends: Option<&[String]>,
) -> Vec<SpecChartSeries> {
    match shape {
        EnumChartSeriesShape::Single { x, y } => vec![SpecChartSeries {
            range_x: x.clone(),
            range_y: y.clone(),
            name: legends.and_then(|l_legends| l_legends.first().cloned()),
        }],
        EnumChartSeriesShape::SharedX { x, ys } => match legends {
            Some(l_legends) => ys
                .iter()
                .zip(l_legends)
                .map(|(y, c_legend)| SpecChartSeries {
                    range_x: x.clone(),
                    range_y: y.clone(),
                    name: Some(c_legend.clone()),
                })
                .collect(),
            None => ys
                .iter()
                .map(|y| SpecChartSeries {
                    range_x: x.clone(),
                    range_y: y.clone(),
                    name: None,
                })
                .collect(),
        },
        EnumChartSeriesShape::Paired { xs, ys } => match legends {
            Some(l_legends) => xs
                .iter()
                .zip(ys)
                .zip(l_legends)
                .map(|((x, y), c_legend)| SpecChartSeries {
                    range_x: x.clone(),
                    range_y: y.clone(),
                    name: Some(c_legend.clone()),
                })
                .collect(),
            None => xs
                .iter()
                .zip(ys)
                .map(|(x, y)| SpecChartSeries {
                    range_x: x.clone(),
                    range_y: y.clone(),
                    name: None,
                })
                .collect(),
        },
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ChartBuilders

/// Construct a scatter chart (straight lines with markers) from a series
/// shape and presentation options.
///
/// Axis bounds, when given, are the min/max of the finite values in the
/// corresponding bound sample. The legend sits on top when legend labels are
/// present and is hidden otherwise.
pub fn create_scatter_chart(
    shape: &EnumChartSeriesShape,
    options: &SpecScatterChartOptions,
) -> Result<Chart, String> {
    let mut chart = Chart::new(ChartType::ScatterStraightWithMarkers);
    chart.set_style(N_IDX_CHART_STYLE_DEFAULT);
    chart.set_height(convert_cm_to_px(options.height_cm)?);
    chart.set_width(convert_cm_to_px(options.width_cm)?);

    if let Some(c_title) = &options.x_title {
        chart.x_axis().set_name(c_title.as_str());
    }
    if let Some(c_title) = &options.y_title {
        chart.y_axis().set_name(c_title.as_str());
    }

    if let Some(l_sample) = &options.x_bounds {
        let (n_min, n_max) = derive_axis_bounds(l_sample)?;
        chart.x_axis().set_min(n_min).set_max(n_max);
    }
    if let Some(l_sample) = &options.y_bounds {
        let (n_min, n_max) = derive_axis_bounds(l_sample)?;
        chart.y_axis().set_min(n_min).set_max(n_max);
    }

    match &options.legends {
        Some(_) => {
            chart.legend().set_position(ChartLegendPosition::Top);
        }
        None => {
            chart.legend().set_hidden();
        }
    }

    for series in plan_scatter_series(shape, options.legends.as_deref()) {
        validate_cell_range(&series.range_x)?;
        validate_cell_range(&series.range_y)?;

        let series_chart = chart.add_series();
        series_chart.set_categories(derive_range_formula(&series.range_x).as_str());
        series_chart.set_values(derive_range_formula(&series.range_y).as_str());
        if let Some(c_name) = &series.name {
            series_chart.set_name(c_name.as_str());
        }
    }

    Ok(chart)
}

/// Construct a vertical bar chart from a category range and a value range.
pub fn create_bar_chart(
    range_categories: &SpecCellRange,
    range_values: &SpecCellRange,
    options: &SpecBarChartOptions,
) -> Result<Chart, String> {
    validate_cell_range(range_categories)?;
    validate_cell_range(range_values)?;

    let mut chart = Chart::new(ChartType::Column);
    chart.set_style(N_IDX_CHART_STYLE_DEFAULT);
    chart.set_height(convert_cm_to_px(options.height_cm)?);
    chart.set_width(convert_cm_to_px(options.width_cm)?);

    if let Some(c_title) = &options.title {
        chart.title().set_name(c_title.as_str());
    }
    if let Some(l_sample) = &options.value_bounds {
        let (n_min, n_max) = derive_axis_bounds(l_sample)?;
        chart.y_axis().set_min(n_min).set_max(n_max);
    }
    chart.legend().set_hidden();

    let series_chart = chart.add_series();
    series_chart.set_values(derive_range_formula(range_values).as_str());
    series_chart.set_categories(derive_range_formula(range_categories).as_str());

    Ok(chart)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
