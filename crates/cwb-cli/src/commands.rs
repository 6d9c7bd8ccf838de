//! Command handlers

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;

use cwb_core::{
    manifest_file_name, FillConfig, JsonSchemaValidator, MetadataValidator, PlanMetadata,
    RecordFormat, TemplateProfile, ValidationIssue, Workbench, WorkbenchError, FILLED_ARCHIVE_NAME,
};

use crate::{FillArgs, MetadataArgs, Status};

async fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}

async fn read_record(path: &Path, kind: &'static str) -> anyhow::Result<Value> {
    let bytes = read(path).await?;
    RecordFormat::from_path(path)
        .parse(kind, &bytes)
        .with_context(|| format!("cannot decode {}", path.display()))
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}

async fn write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("cannot write {}", path.display()))
}

async fn validator(schema: Option<&Path>) -> anyhow::Result<JsonSchemaValidator> {
    let validator = match schema {
        Some(path) => JsonSchemaValidator::new(&read_record(path, "schema").await?)?,
        None => JsonSchemaValidator::builtin()?,
    };
    Ok(validator)
}

fn report_issues(issues: &[ValidationIssue]) -> Status {
    println!("metadata is invalid ({} issue(s)):", issues.len());
    for issue in issues {
        println!("  {issue}");
    }
    Status::Failed
}

async fn fill_config(args: &FillArgs) -> anyhow::Result<FillConfig> {
    let mut config = match &args.config {
        Some(path) => toml::from_str(&read_text(path).await?)
            .with_context(|| format!("invalid configuration {}", path.display()))?,
        None => FillConfig::new(),
    };
    if let Some(path) = &args.profile {
        let profile = TemplateProfile::from_toml(&read_text(path).await?)
            .with_context(|| format!("invalid profile {}", path.display()))?;
        config = config.with_profile(profile);
    }
    if let Some(separator) = &args.separator {
        config = config.with_append_separator(separator.clone());
    }
    if let (Some(template), Some(answers)) = (file_name(&args.template), file_name(&args.answers)) {
        if template != answers {
            config = config.with_input_names(template, answers);
        }
    }
    Ok(config)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

pub(crate) async fn fill(args: FillArgs) -> anyhow::Result<Status> {
    let (template, answers, metadata, validator, config) = tokio::try_join!(
        read(&args.template),
        read(&args.answers),
        read_record(&args.metadata.metadata, "metadata"),
        validator(args.metadata.schema.as_deref()),
        fill_config(&args),
    )?;

    let workbench = Workbench::new(config, validator);
    let report = match workbench
        .fill_async(template, answers, RecordFormat::from_path(&args.answers), metadata)
        .await
    {
        Err(WorkbenchError::Validation(failed)) => return Ok(report_issues(failed.issues())),
        result => result?,
    };

    for line in report.log.lines() {
        println!("{line}");
    }

    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("cannot create {}", args.out.display()))?;
    let archive_path = args.out.join(args.name.as_deref().unwrap_or(FILLED_ARCHIVE_NAME));
    let manifest_path = args.out.join(manifest_file_name(report.manifest.module_id()));
    let manifest_json = serde_json::to_string_pretty(&report.manifest)?;
    tokio::try_join!(
        write(&archive_path, &report.archive),
        write(&manifest_path, manifest_json.as_bytes()),
    )?;

    tracing::info!(
        run_id = %report.run_id,
        archive = %archive_path.display(),
        manifest = %manifest_path.display(),
        "outputs written"
    );

    if args.strict && !report.log.is_clean() {
        return Ok(Status::Failed);
    }
    Ok(Status::Ok)
}

pub(crate) async fn hash(args: MetadataArgs) -> anyhow::Result<Status> {
    let (metadata, validator) = tokio::try_join!(
        read_record(&args.metadata, "metadata"),
        validator(args.schema.as_deref()),
    )?;
    match Workbench::new(FillConfig::new(), validator).content_hash(&metadata) {
        Ok(hash) => {
            println!("{hash}");
            Ok(Status::Ok)
        }
        Err(WorkbenchError::Validation(failed)) => Ok(report_issues(failed.issues())),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn seal(args: MetadataArgs, out: PathBuf) -> anyhow::Result<Status> {
    let (metadata, validator) = tokio::try_join!(
        read_record(&args.metadata, "metadata"),
        validator(args.schema.as_deref()),
    )?;
    let manifest = match Workbench::new(FillConfig::new(), validator).save_metadata(&metadata) {
        Ok(manifest) => manifest,
        Err(WorkbenchError::Validation(failed)) => return Ok(report_issues(failed.issues())),
        Err(err) => return Err(err.into()),
    };

    tokio::fs::create_dir_all(&out)
        .await
        .with_context(|| format!("cannot create {}", out.display()))?;
    let path = out.join(manifest_file_name(manifest.module_id()));
    write(&path, serde_json::to_string_pretty(&manifest)?.as_bytes()).await?;
    println!("{}", manifest.content_hash());
    Ok(Status::Ok)
}

pub(crate) async fn validate(args: MetadataArgs) -> anyhow::Result<Status> {
    let (metadata, validator) = tokio::try_join!(
        read_record(&args.metadata, "metadata"),
        validator(args.schema.as_deref()),
    )?;
    match validator.validate(&metadata) {
        Ok(()) => {
            println!("metadata is valid");
            Ok(Status::Ok)
        }
        Err(issues) => Ok(report_issues(&issues)),
    }
}

pub(crate) async fn canonicalize(input: PathBuf) -> anyhow::Result<Status> {
    let value = read_record(&input, "input").await?;
    println!("{}", cwb_artifact::canonical_string(&value)?);
    Ok(Status::Ok)
}

pub(crate) async fn blank(out: Option<PathBuf>) -> anyhow::Result<Status> {
    let text = serde_json::to_string_pretty(&PlanMetadata::blank_document().to_value())?;
    match out {
        Some(path) => write(&path, text.as_bytes()).await?,
        None => println!("{text}"),
    }
    Ok(Status::Ok)
}
