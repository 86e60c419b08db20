use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{StructArray, TryExtend};
use arrow::datatypes::{ArrowDataType, ArrowSchema, Field as ArrowField};
use arrow::record_batch::RecordBatchT;
use chartkit_io_xlsx::chart::{create_bar_chart, create_scatter_chart};
use chartkit_io_xlsx::spec::{
    EnumChartSeriesShape, SpecBarChartOptions, SpecCellRange, SpecScatterChartOptions,
};
use chartkit_io_xlsx::util::{derive_range_formula, parse_range_formula};
use chartkit_io_xlsx::XlsxChartBook as RsXlsxChartBook;
use polars::prelude::DataFrame;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::ffi as pyffi;
use pyo3::prelude::*;
use pyo3::types::{PyAny, PyDict, PyList};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "chartkit.xlsx.chartbook.v1";
const C_BRIDGE_TRANSPORT: &str = "arrow_c_data";
const C_ARROW_ARRAY_STREAM_CAPSULE_NAME: &[u8] = b"arrow_array_stream\0";

/// Cell range argument shape mirrored from the Python call site.
enum EnumRangeArg {
    One(SpecCellRange),
    Many(Vec<SpecCellRange>),
}

#[pyclass(name = "ChartBook")]
struct PyChartBook {
    #[pyo3(get)]
    file_out: String,
    inner: RsXlsxChartBook,
}

#[pymethods]
impl PyChartBook {
    #[new]
    fn new(file_out: String) -> Self {
        let path_file_out = PathBuf::from(&file_out);
        Self {
            file_out,
            inner: RsXlsxChartBook::new(path_file_out),
        }
    }

    fn __enter__(slf: PyRefMut<'_, Self>) -> PyRefMut<'_, Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc=None, _tb=None))]
    fn __exit__(
        &mut self,
        _exc_type: Option<&Bound<'_, PyAny>>,
        _exc: Option<&Bound<'_, PyAny>>,
        _tb: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<()> {
        self.close()
    }

    fn close(&mut self) -> PyResult<()> {
        self.inner.close().map_err(PyRuntimeError::new_err)
    }

    fn report(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let l_reports = self.inner.report();

        let mut l_report_obj = Vec::with_capacity(l_reports.len());
        for report in l_reports {
            let dict_report = PyDict::new(py);
            dict_report.set_item("sheet_name", report.sheet_name)?;
            dict_report.set_item("n_rows_written", report.n_rows_written)?;
            dict_report.set_item("n_cols_written", report.n_cols_written)?;
            dict_report.set_item("range_cells", derive_range_formula(&report.range_cells))?;
            dict_report.set_item("warnings", report.warnings)?;
            l_report_obj.push(dict_report.unbind());
        }

        let l_result = PyList::new(py, l_report_obj)?;
        Ok(l_result.into_any().unbind())
    }

    #[pyo3(signature = (df, title = None, if_header = true))]
    fn copy_dataframe_to_worksheet(
        &mut self,
        py: Python<'_>,
        df: &Bound<'_, PyAny>,
        title: Option<&str>,
        if_header: bool,
    ) -> PyResult<String> {
        let df_data = derive_dataframe_from_any_dataframe(py, df)?;
        let report = self
            .inner
            .copy_dataframe_to_worksheet(&df_data, title, if_header)
            .map_err(PyValueError::new_err)?;
        Ok(report.sheet_name)
    }

    #[pyo3(signature = (sheet_name, df, start_cell = "A1", col_labels = None))]
    fn copy_dataframe_to_cells(
        &mut self,
        py: Python<'_>,
        sheet_name: &str,
        df: &Bound<'_, PyAny>,
        start_cell: &str,
        col_labels: Option<&str>,
    ) -> PyResult<String> {
        let df_data = derive_dataframe_from_any_dataframe(py, df)?;
        let range_body = self
            .inner
            .copy_dataframe_to_cells(sheet_name, &df_data, start_cell, col_labels)
            .map_err(PyValueError::new_err)?;
        Ok(derive_range_formula(&range_body))
    }

    #[pyo3(signature = (
        sheet_name,
        anchor,
        x_cells,
        y_cells,
        x_title = None,
        y_title = None,
        x_range = None,
        y_range = None,
        legends = None,
        height = None,
        width = None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn add_scatter_chart(
        &mut self,
        sheet_name: &str,
        anchor: &str,
        x_cells: &Bound<'_, PyAny>,
        y_cells: &Bound<'_, PyAny>,
        x_title: Option<String>,
        y_title: Option<String>,
        x_range: Option<Vec<f64>>,
        y_range: Option<Vec<f64>>,
        legends: Option<&Bound<'_, PyAny>>,
        height: Option<f64>,
        width: Option<f64>,
    ) -> PyResult<()> {
        let shape = parse_series_shape(x_cells, y_cells)?;

        let cfg_default = SpecScatterChartOptions::default();
        let options = SpecScatterChartOptions {
            x_title,
            y_title,
            x_bounds: x_range,
            y_bounds: y_range,
            legends: parse_legend_labels(legends)?,
            height_cm: height.unwrap_or(cfg_default.height_cm),
            width_cm: width.unwrap_or(cfg_default.width_cm),
        };

        let chart = create_scatter_chart(&shape, &options).map_err(PyValueError::new_err)?;
        self.inner
            .insert_chart(sheet_name, anchor, &chart)
            .map_err(PyValueError::new_err)
    }

    #[pyo3(signature = (
        sheet_name,
        anchor,
        x_cells,
        y_cells,
        title = None,
        value_range = None,
        height = None,
        width = None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn add_bar_chart(
        &mut self,
        sheet_name: &str,
        anchor: &str,
        x_cells: &str,
        y_cells: &str,
        title: Option<String>,
        value_range: Option<Vec<f64>>,
        height: Option<f64>,
        width: Option<f64>,
    ) -> PyResult<()> {
        let range_categories = parse_range_formula(x_cells).map_err(PyValueError::new_err)?;
        let range_values = parse_range_formula(y_cells).map_err(PyValueError::new_err)?;

        let cfg_default = SpecBarChartOptions::default();
        let options = SpecBarChartOptions {
            title,
            value_bounds: value_range,
            height_cm: height.unwrap_or(cfg_default.height_cm),
            width_cm: width.unwrap_or(cfg_default.width_cm),
        };

        let chart = create_bar_chart(&range_categories, &range_values, &options)
            .map_err(PyValueError::new_err)?;
        self.inner
            .insert_chart(sheet_name, anchor, &chart)
            .map_err(PyValueError::new_err)
    }
}

fn parse_range_arg(value: &Bound<'_, PyAny>) -> PyResult<EnumRangeArg> {
    if let Ok(c_formula) = value.extract::<String>() {
        let range = parse_range_formula(&c_formula).map_err(PyValueError::new_err)?;
        return Ok(EnumRangeArg::One(range));
    }
    if let Ok(l_formulas) = value.extract::<Vec<String>>() {
        let mut l_ranges = Vec::with_capacity(l_formulas.len());
        for c_formula in &l_formulas {
            l_ranges.push(parse_range_formula(c_formula).map_err(PyValueError::new_err)?);
        }
        return Ok(EnumRangeArg::Many(l_ranges));
    }

    Err(PyValueError::new_err(
        "Cell ranges must be str or sequence[str].",
    ))
}

fn parse_series_shape(
    x_cells: &Bound<'_, PyAny>,
    y_cells: &Bound<'_, PyAny>,
) -> PyResult<EnumChartSeriesShape> {
    match (parse_range_arg(x_cells)?, parse_range_arg(y_cells)?) {
        (EnumRangeArg::One(x), EnumRangeArg::One(y)) => Ok(EnumChartSeriesShape::Single { x, y }),
        (EnumRangeArg::One(x), EnumRangeArg::Many(ys)) => {
            Ok(EnumChartSeriesShape::SharedX { x, ys })
        }
        (EnumRangeArg::Many(xs), EnumRangeArg::Many(ys)) => {
            Ok(EnumChartSeriesShape::Paired { xs, ys })
        }
        (EnumRangeArg::Many(_), EnumRangeArg::One(_)) => Err(PyValueError::new_err(
            "x_cells may only be a sequence when y_cells is a sequence.",
        )),
    }
}

fn parse_legend_labels(value: Option<&Bound<'_, PyAny>>) -> PyResult<Option<Vec<String>>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_none() {
        return Ok(None);
    }

    if let Ok(c_value) = value.extract::<String>() {
        return Ok(Some(vec![c_value]));
    }
    if let Ok(l_values) = value.extract::<Vec<String>>() {
        return Ok(Some(l_values));
    }

    Err(PyValueError::new_err(
        "Legends must be str, sequence[str], or None.",
    ))
}

fn derive_dataframe_from_any_dataframe(
    py: Python<'_>,
    df: &Bound<'_, PyAny>,
) -> PyResult<DataFrame> {
    let df_polars = convert_to_polars_dataframe(py, df)?;
    let obj_capsule = df_polars.call_method0("__arrow_c_stream__")?;
    derive_dataframe_from_arrow_c_stream_capsule(&obj_capsule)
}

fn derive_dataframe_from_arrow_c_stream_capsule(
    obj_capsule: &Bound<'_, PyAny>,
) -> PyResult<DataFrame> {
    let ptr_capsule = obj_capsule.as_ptr();
    let ptr_stream_name = C_ARROW_ARRAY_STREAM_CAPSULE_NAME
        .as_ptr()
        .cast::<std::os::raw::c_char>();

    // Safety: We only pass pointers owned by the Python object for validation.
    let if_valid_capsule = unsafe { pyffi::PyCapsule_IsValid(ptr_capsule, ptr_stream_name) };
    if if_valid_capsule == 0 {
        return Err(PyValueError::new_err(
            "Expected a valid `arrow_array_stream` PyCapsule.",
        ));
    }

    // Safety: Capsule name was validated as `arrow_array_stream` above.
    let ptr_stream = unsafe { pyffi::PyCapsule_GetPointer(ptr_capsule, ptr_stream_name) };
    if ptr_stream.is_null() {
        return Err(PyValueError::new_err(
            "Arrow C stream capsule pointer is null.",
        ));
    }

    let stream = ptr_stream.cast::<arrow::ffi::ArrowArrayStream>();
    // Safety: `stream` points to a live ArrowArrayStream owned by the capsule.
    let mut reader = unsafe { arrow::ffi::ArrowArrayStreamReader::try_new(&mut *stream) }
        .map_err(|err| PyValueError::new_err(format!("Failed to open Arrow C stream: {err}")))?;

    let schema_arrow = derive_arrow_schema_from_stream_field(reader.field())?;
    let schema_ref = Arc::new(schema_arrow.clone());
    let mut df = DataFrame::empty_with_arrow_schema(&schema_arrow);

    while let Some(res_array) = unsafe { reader.next() } {
        let array_row_batch = res_array.map_err(|err| {
            PyValueError::new_err(format!("Failed to read Arrow stream batch: {err}"))
        })?;

        let array_struct = array_row_batch
            .as_any()
            .downcast_ref::<StructArray>()
            .ok_or_else(|| {
                PyValueError::new_err(
                    "Arrow C stream must yield StructArray batches for DataFrame import.",
                )
            })?;

        let l_arrays = array_struct.values().to_vec();
        let record_batch = RecordBatchT::try_new(array_struct.len(), schema_ref.clone(), l_arrays)
            .map_err(|err| {
                PyValueError::new_err(format!(
                    "Failed to construct Arrow record batch from stream: {err}"
                ))
            })?;

        df.try_extend(std::iter::once(record_batch))
            .map_err(|err| {
                PyValueError::new_err(format!(
                    "Failed to append Arrow record batch to DataFrame: {err}"
                ))
            })?;
    }

    Ok(df)
}

fn derive_arrow_schema_from_stream_field(field: &ArrowField) -> PyResult<ArrowSchema> {
    match field.dtype() {
        ArrowDataType::Struct(fields) => Ok(fields
            .iter()
            .cloned()
            .map(|field_inner| (field_inner.name.clone(), field_inner))
            .collect::<ArrowSchema>()),
        dtype => Err(PyValueError::new_err(format!(
            "Arrow stream schema must be Struct, got: {dtype:?}"
        ))),
    }
}

fn convert_to_polars_dataframe<'py>(
    py: Python<'py>,
    df: &Bound<'py, PyAny>,
) -> PyResult<Bound<'py, PyAny>> {
    let module_polars = py.import("polars")?;
    let cls_dataframe = module_polars.getattr("DataFrame")?;

    if df.is_instance(&cls_dataframe)? {
        return Ok(df.clone());
    }

    cls_dataframe.call1((df,))
}

#[pymodule]
fn _chartkit_io_xlsx_rs(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyChartBook>()?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
