use std::path::Path;

use tantivy::{
    Index,
    IndexReader,
    TantivyDocument,
    collector::TopDocs,
    query::QueryParser,
    schema::{
        Field,
        IndexRecordOption,
        STORED,
        STRING,
        Schema,
        TextFieldIndexing,
        TextOptions,
        Value,
    },
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::{
    engine::{Hit, IndexHandle, SearchEngine},
    error::{Error, Result},
};

/// Field names shared between archive publishers and this consumer.
pub mod fields {
    pub const NAME: &str = "name";
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
}

/// Archive members that make up a Tantivy index directory.
const TANTIVY_EXTENSIONS: &[&str] = &[
    "json", "term", "idx", "pos", "store", "fast", "fieldnorm", "del",
];

/// The bundled [`SearchEngine`], backed by Tantivy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TantivyEngine;

impl TantivyEngine {
    pub fn new() -> Self {
        Self
    }
}

/// The document schema archives of this format are built with: a raw
/// stored `name`, a stemmed stored `title` and a stemmed `body`.
pub fn doc_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(fields::NAME, STRING | STORED);

    let title_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    builder.add_text_field(fields::TITLE, title_opts);

    let body_opts = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    builder.add_text_field(fields::BODY, body_opts);

    builder.build()
}

/// Register the analyzers the schema refers to. Must run on every
/// opened index before it is read or written.
pub fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

impl SearchEngine for TantivyEngine {
    type Handle = TantivyIndexHandle;

    fn open(&self, dir: &Path) -> Result<TantivyIndexHandle> {
        let open_err = |reason: String| Error::IndexOpen {
            path: dir.to_path_buf(),
            reason,
        };

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| open_err(e.to_string()))?;
        let index =
            Index::open(mmap_dir).map_err(|e| open_err(e.to_string()))?;
        register_tokenizers(&index);

        let schema = index.schema();
        let name = schema
            .get_field(fields::NAME)
            .map_err(|_| open_err("schema has no `name` field".into()))?;
        let body = schema
            .get_field(fields::BODY)
            .map_err(|_| open_err("schema has no `body` field".into()))?;
        // Some published indices predate the stored title field.
        let title = schema.get_field(fields::TITLE).ok();

        let reader = index.reader().map_err(|e| open_err(e.to_string()))?;

        Ok(TantivyIndexHandle {
            index,
            reader,
            name,
            title,
            body,
        })
    }

    fn archive_extensions(&self) -> &'static [&'static str] {
        TANTIVY_EXTENSIONS
    }
}

/// An opened Tantivy index plus its resolved schema fields.
pub struct TantivyIndexHandle {
    index: Index,
    reader: IndexReader,
    name: Field,
    title: Option<Field>,
    body: Field,
}

impl IndexHandle for TantivyIndexHandle {
    fn search(&self, query_str: &str, limit: usize) -> Result<Vec<Hit>> {
        if limit == 0 {
            return Ok(vec![]);
        }

        self.reader.reload()?;
        let searcher = self.reader.searcher();

        // Strict parse: a malformed query is an error, never an empty
        // result set. `body` is the default field; field-scoped terms
        // like `title:foo` go through the grammar.
        let parser = QueryParser::for_index(&self.index, vec![self.body]);
        let query = parser
            .parse_query(query_str)
            .map_err(|e| Error::QueryParse(e.to_string()))?;

        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            hits.push(Hit {
                name: extract_text(&doc, self.name).unwrap_or_default(),
                title: self.title.and_then(|field| extract_text(&doc, field)),
                score,
            });
        }

        Ok(hits)
    }
}

impl std::fmt::Debug for TantivyIndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyIndexHandle").finish_non_exhaustive()
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
