use crate::error::Result;
use crate::structs::{RollingPoint, SeasonalProfile};
use arrow_array::{BooleanArray, Float64Array, RecordBatch, StringArray, UInt32Array};
use arrow_schema::{DataType, Field, Schema};
use csv::Writer;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::{fs::File, path::Path, sync::Arc};

fn format_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// Writes the seasonal profile table to a CSV file with formatted numeric
/// values. An undefined std becomes an empty field.
pub fn write_profiles_csv(profiles: &[SeasonalProfile], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["City", "Season", "Mean_Temp", "Std_Temp", "Count"])?;

    for profile in profiles {
        writer.write_record(&[
            profile.city.to_string(),
            profile.season.to_string(),
            format!("{:.2}", profile.mean_temperature),
            format_opt(profile.std_temperature),
            profile.count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the seasonal profile table to a pretty-formatted JSON file.
pub fn write_profiles_json(profiles: &[SeasonalProfile], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, profiles)?;
    Ok(())
}

/// Writes the seasonal profile table to a columnar Parquet file using Arrow
/// format.
pub fn write_profiles_parquet(profiles: &[SeasonalProfile], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("city", DataType::Utf8, false),
        Field::new("season", DataType::Utf8, false),
        Field::new("mean_temperature", DataType::Float64, false),
        Field::new("std_temperature", DataType::Float64, true),
        Field::new("count", DataType::UInt32, false),
    ]));

    let cities: StringArray =
        StringArray::from_iter_values(profiles.iter().map(|p| p.city.as_str()));
    let seasons: StringArray =
        StringArray::from_iter_values(profiles.iter().map(|p| p.season.to_string()));
    let means: Float64Array = profiles.iter().map(|p| p.mean_temperature).collect();
    let stds: Float64Array = profiles.iter().map(|p| p.std_temperature).collect();
    let counts: UInt32Array = profiles.iter().map(|p| p.count).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(cities),
            Arc::new(seasons),
            Arc::new(means),
            Arc::new(stds),
            Arc::new(counts),
        ],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

/// Writes the annotated series to a CSV file. Undefined rolling statistics
/// become empty fields.
pub fn write_series_csv(points: &[RollingPoint], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        "City",
        "Date",
        "Season",
        "Temperature",
        "Rolling_Mean",
        "Rolling_Std",
        "Lower_Bound",
        "Upper_Bound",
        "Is_Anomaly",
        "Trend_Long",
    ])?;

    for point in points {
        writer.write_record(&[
            point.city.to_string(),
            point.date.to_string(),
            point.season.to_string(),
            format_opt(point.temperature),
            format_opt(point.rolling_mean),
            format_opt(point.rolling_std),
            format_opt(point.lower_bound),
            format_opt(point.upper_bound),
            point.is_anomaly.to_string(),
            format_opt(point.trend_long),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the annotated series to a pretty-formatted JSON file.
pub fn write_series_json(points: &[RollingPoint], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, points)?;
    Ok(())
}

/// Writes the annotated series to a columnar Parquet file using Arrow
/// format. Undefined statistics map to nullable columns.
pub fn write_series_parquet(points: &[RollingPoint], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("city", DataType::Utf8, false),
        Field::new("date", DataType::Utf8, false),
        Field::new("season", DataType::Utf8, false),
        Field::new("temperature", DataType::Float64, true),
        Field::new("rolling_mean", DataType::Float64, true),
        Field::new("rolling_std", DataType::Float64, true),
        Field::new("lower_bound", DataType::Float64, true),
        Field::new("upper_bound", DataType::Float64, true),
        Field::new("is_anomaly", DataType::Boolean, false),
        Field::new("trend_long", DataType::Float64, true),
    ]));

    let cities: StringArray =
        StringArray::from_iter_values(points.iter().map(|p| p.city.as_str()));
    let dates: StringArray =
        StringArray::from_iter_values(points.iter().map(|p| p.date.to_string()));
    let seasons: StringArray =
        StringArray::from_iter_values(points.iter().map(|p| p.season.to_string()));
    let temperatures: Float64Array = points.iter().map(|p| p.temperature).collect();
    let rolling_means: Float64Array = points.iter().map(|p| p.rolling_mean).collect();
    let rolling_stds: Float64Array = points.iter().map(|p| p.rolling_std).collect();
    let lower_bounds: Float64Array = points.iter().map(|p| p.lower_bound).collect();
    let upper_bounds: Float64Array = points.iter().map(|p| p.upper_bound).collect();
    let anomalies = BooleanArray::from(points.iter().map(|p| p.is_anomaly).collect::<Vec<bool>>());
    let trends: Float64Array = points.iter().map(|p| p.trend_long).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(cities),
            Arc::new(dates),
            Arc::new(seasons),
            Arc::new(temperatures),
            Arc::new(rolling_means),
            Arc::new(rolling_stds),
            Arc::new(lower_bounds),
            Arc::new(upper_bounds),
            Arc::new(anomalies),
            Arc::new(trends),
        ],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}
