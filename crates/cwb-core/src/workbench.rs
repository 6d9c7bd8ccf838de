//! Workbench run orchestration
//!
//! One fill run:
//!
//! 1. Validate the authoritative metadata (blocks the run on failure)
//! 2. Hash the raw template archive and answer record
//! 3. Decode the records and parse the document part
//! 4. Run the injection engine
//! 5. Repack the archive with only the document part rewritten
//! 6. Seal the manifest over the canonical metadata
//!
//! Archive and parse failures abort before anything is written. Label and
//! value misses are data in the [`InjectionLog`] and never abort a run.

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use cwb_artifact::{ContentHash, Manifest, ProvenanceHasher};
use cwb_docx::{read_tree, write_tree};

use crate::config::FillConfig;
use crate::engine::{FailureKind, InjectionEngine, InjectionLog};
use crate::error::{ValidationFailed, WorkbenchError, WorkbenchResult};
use crate::records::{AnswerRecord, PlanMetadata, RecordFormat};
use crate::resolver::Resolver;
use crate::validation::{JsonSchemaValidator, MetadataValidator, SchemaError};

type InputHashes = [(String, ContentHash); 2];

/// Everything a fill run produces
#[derive(Debug, Clone)]
pub struct FillReport {
    /// Id of the `fill` span this run was traced under
    pub run_id: Uuid,
    /// Filled archive bytes
    pub archive: Vec<u8>,
    /// Per-field outcomes
    pub log: InjectionLog,
    /// Provenance manifest of the run
    pub manifest: Manifest,
}

/// Runs fills and metadata saves under one configuration
#[derive(Debug)]
pub struct Workbench<V = JsonSchemaValidator> {
    config: FillConfig,
    validator: V,
}

impl Workbench<JsonSchemaValidator> {
    /// Workbench validating against the built-in plan metadata schema
    ///
    /// # Errors
    /// `SchemaError` if the bundled schema cannot be compiled
    pub fn with_builtin_schema(config: FillConfig) -> Result<Self, SchemaError> {
        Ok(Self::new(config, JsonSchemaValidator::builtin()?))
    }
}

impl<V: MetadataValidator> Workbench<V> {
    #[must_use]
    pub fn new(config: FillConfig, validator: V) -> Self {
        Self { config, validator }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    /// Check `metadata`, keeping every issue
    ///
    /// # Errors
    /// `ValidationFailed` with the validator's issues, verbatim
    pub fn validate(&self, metadata: &Value) -> Result<(), ValidationFailed> {
        self.validator.validate(metadata).map_err(|issues| {
            tracing::warn!(issues = issues.len(), "metadata failed validation");
            ValidationFailed::new(issues)
        })
    }

    /// Content hash of a valid metadata record
    ///
    /// # Errors
    /// `Validation` if the record is invalid, `Hash` if it cannot be rendered
    pub fn content_hash(&self, metadata: &Value) -> WorkbenchResult<ContentHash> {
        self.validate(metadata)?;
        Ok(ContentHash::of_canonical(metadata)?)
    }

    /// Fill `template` from `metadata` and the answer record
    ///
    /// # Errors
    /// `Validation` before any work if the metadata is invalid; `Document`
    /// on archive, parse or serialize failure; `Record` if an input cannot
    /// be decoded
    pub fn fill(
        &self,
        template: &[u8],
        answers: &[u8],
        answers_format: RecordFormat,
        metadata: &Value,
    ) -> WorkbenchResult<FillReport> {
        let run_id = Uuid::new_v4();
        let span = self.run_span(run_id);
        let _enter = span.enter();

        self.validate(metadata)?;
        let inputs = self.input_hashes(ContentHash::compute(template), ContentHash::compute(answers));
        self.inject(run_id, template, answers, answers_format, metadata, inputs)
    }

    /// [`Workbench::fill`] with the input digests computed concurrently
    ///
    /// # Errors
    /// As [`Workbench::fill`]; `Task` if a hashing task panics
    pub async fn fill_async(
        &self,
        template: Vec<u8>,
        answers: Vec<u8>,
        answers_format: RecordFormat,
        metadata: Value,
    ) -> WorkbenchResult<FillReport> {
        let run_id = Uuid::new_v4();
        let span = self.run_span(run_id);

        async move {
            self.validate(&metadata)?;
            let template: Arc<[u8]> = template.into();
            let answers: Arc<[u8]> = answers.into();
            let (template_hash, answers_hash) =
                hash_inputs(Arc::clone(&template), Arc::clone(&answers)).await?;
            let inputs = self.input_hashes(template_hash, answers_hash);
            self.inject(run_id, &template, &answers, answers_format, &metadata, inputs)
        }
        .instrument(span)
        .await
    }

    /// Seal a metadata manifest for a valid record
    ///
    /// The manifest carries no input hashes.
    ///
    /// # Errors
    /// `Validation` if the record is invalid; `Record` if it is not a mapping
    pub fn save_metadata(&self, metadata: &Value) -> WorkbenchResult<Manifest> {
        self.validate(metadata)?;
        PlanMetadata::from_value(metadata)?;

        let manifest = ProvenanceHasher::new(self.config.metadata_module()).seal(
            metadata,
            Vec::<(String, ContentHash)>::new(),
            None,
        )?;
        tracing::info!(content_hash = %manifest.content_hash(), "metadata manifest sealed");
        Ok(manifest)
    }

    fn input_hashes(&self, template: ContentHash, answers: ContentHash) -> InputHashes {
        [
            (self.config.template_input.clone(), template),
            (self.config.answers_input.clone(), answers),
        ]
    }

    fn run_span(&self, run_id: Uuid) -> tracing::Span {
        tracing::info_span!("fill", %run_id, module = %self.config.module_id)
    }

    fn inject(
        &self,
        run_id: Uuid,
        template: &[u8],
        answers: &[u8],
        answers_format: RecordFormat,
        metadata: &Value,
        inputs: InputHashes,
    ) -> WorkbenchResult<FillReport> {
        let part = self.config.document_part.as_str();
        let mut tree = read_tree(template, part)?;
        tracing::debug!(part, nodes = tree.node_count(), "parsed document part");

        let plan_metadata = PlanMetadata::from_value(metadata)?;
        let answer_record = AnswerRecord::from_value(&answers_format.parse("answer", answers)?)?;

        let log = InjectionEngine::new(&self.config.profile)
            .with_separator(&self.config.append_separator)
            .run(&mut tree, &Resolver::new(&plan_metadata, &answer_record))?;

        let archive = write_tree(template, part, &tree)?;
        tracing::debug!(part, bytes = archive.len(), "repacked archive");

        let manifest = ProvenanceHasher::new(self.config.fill_module()).seal(metadata, inputs, None)?;
        tracing::info!(
            filled = log.outcomes().filter(|(_, outcome)| outcome.ok).count(),
            unlocated = log.failures(FailureKind::LocatorNotFound),
            unresolved = log.failures(FailureKind::ValueUnresolved),
            content_hash = %manifest.content_hash(),
            "fill complete"
        );

        Ok(FillReport {
            run_id,
            archive,
            log,
            manifest,
        })
    }
}

async fn hash_inputs(
    template: Arc<[u8]>,
    answers: Arc<[u8]>,
) -> WorkbenchResult<(ContentHash, ContentHash)> {
    tokio::try_join!(
        tokio::task::spawn_blocking(move || ContentHash::compute(&template)),
        tokio::task::spawn_blocking(move || ContentHash::compute(&answers)),
    )
    .map_err(|e| WorkbenchError::Task(e.to_string()))
}
