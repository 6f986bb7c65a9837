//! One-pass index construction.
//!
//! Grounded on `build_inverted_index`: accumulate postings in a
//! `HashMap<String, Term>` while walking the corpus once, then freeze into
//! dense, id-indexed arrays. A `rayon`-gated parallel variant provides a
//! map-reduce-over-chunks fallback, used when the `parallel` feature is
//! enabled and the corpus is large enough to amortize the fan-out.

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::tokenizer::{StandardTokenizer, Tokenizer};
use crate::types::{CorpusStats, Document, InternalId, InvertedIndex, Posting, Term};

use super::prefix::PrefixIndex;

/// High bit of a posting's weight byte: set when this occurrence sits at a
/// word boundary. The low bits still carry the field's `WeightClass` value
/// (1, 2, or 4), which never sets bit 7, so the two pack without collision.
pub const WORD_START_BIT: u8 = 0x80;

pub fn is_word_start(weight: u8) -> bool {
    weight & WORD_START_BIT != 0
}

const PARALLEL_CHUNK_THRESHOLD: usize = 4096;

/// Builds the frozen, read-only index from a list of already-ingested
/// documents (dense internal ids assigned by the caller, segment-0-first
/// per document key).
pub fn build_index(documents: Vec<Document>, config: &EngineConfig) -> InvertedIndex {
    #[cfg(feature = "parallel")]
    {
        if documents.len() >= PARALLEL_CHUNK_THRESHOLD {
            return build_index_parallel(documents, config);
        }
    }
    build_index_sequential(documents, config)
}

fn build_index_sequential(documents: Vec<Document>, config: &EngineConfig) -> InvertedIndex {
    let tokenizer = StandardTokenizer::from_config(config);
    let mut term_ids: HashMap<String, u32> = HashMap::new();
    let mut terms: Vec<Term> = Vec::new();
    // term id -> internal id -> accumulated term frequency, built before
    // freezing into sorted-by-internal-id postings.
    let mut postings_acc: Vec<HashMap<u32, (u8, u32)>> = Vec::new();

    let mut total_len: u64 = 0;

    for doc in &documents {
        if doc.deleted {
            continue;
        }
        let tokens = tokenizer.tokenize_for_index(doc.text());
        total_len += tokens.len() as u64;
        let weight = doc
            .fields
            .get(&doc.text_field)
            .map(|f| f.weight.as_byte())
            .unwrap_or(2);

        for tok in tokens {
            let term_id = *term_ids.entry(tok.text.clone()).or_insert_with(|| {
                let id = terms.len() as u32;
                terms.push(Term {
                    text: tok.text.clone(),
                    id,
                    postings: Vec::new(),
                });
                postings_acc.push(HashMap::new());
                id
            });
            let entry = postings_acc[term_id as usize]
                .entry(doc.internal_id.get())
                .or_insert((weight, 0));
            entry.1 += 1;
        }
    }

    for (term, acc) in terms.iter_mut().zip(postings_acc.into_iter()) {
        let mut postings: Vec<Posting> = acc
            .into_iter()
            .map(|(internal_id, (weight, term_freq))| Posting {
                internal_id,
                weight,
                term_freq,
            })
            .collect();
        postings.sort_by_key(|p| p.internal_id);
        term.postings = postings;
    }

    let doc_count = documents.iter().filter(|d| !d.deleted).count() as u32;
    let avg_doc_len = if doc_count > 0 {
        total_len as f64 / doc_count as f64
    } else {
        0.0
    };

    let texts: Vec<String> = terms.iter().map(|t| t.text.clone()).collect();
    let prefix = PrefixIndex::build(&texts);

    InvertedIndex {
        term_ids,
        terms,
        prefix,
        documents,
        stats: CorpusStats {
            doc_count,
            avg_doc_len,
        },
    }
}

#[cfg(feature = "parallel")]
fn build_index_parallel(documents: Vec<Document>, config: &EngineConfig) -> InvertedIndex {
    use rayon::prelude::*;

    let tokenizer = StandardTokenizer::from_config(config);
    let chunk_size = (documents.len() / rayon::current_num_threads().max(1)).max(1);

    // Map: each chunk produces its own term -> postings map, keyed by term
    // text (not yet assigned a dense id, since chunks run independently).
    let partials: Vec<HashMap<String, Vec<Posting>>> = documents
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut local: HashMap<String, Vec<Posting>> = HashMap::new();
            for doc in chunk {
                if doc.deleted {
                    continue;
                }
                let weight = doc
                    .fields
                    .get(&doc.text_field)
                    .map(|f| f.weight.as_byte())
                    .unwrap_or(2);
                let mut freq: HashMap<String, u32> = HashMap::new();
                for tok in tokenizer.tokenize_for_index(doc.text()) {
                    *freq.entry(tok.text).or_insert(0) += 1;
                }
                for (text, term_freq) in freq {
                    local.entry(text).or_default().push(Posting {
                        internal_id: doc.internal_id.get(),
                        weight,
                        term_freq,
                    });
                }
            }
            local
        })
        .collect();

    // Reduce: merge partials sequentially (term counts are small relative
    // to document counts, so this merge is cheap next to the parallel
    // tokenization pass it follows).
    let mut merged: HashMap<String, Vec<Posting>> = HashMap::new();
    for partial in partials {
        for (text, mut postings) in partial {
            merged.entry(text).or_default().append(&mut postings);
        }
    }

    let mut term_ids = HashMap::new();
    let mut terms = Vec::with_capacity(merged.len());
    for (text, mut postings) in merged {
        postings.sort_by_key(|p| p.internal_id);
        let id = terms.len() as u32;
        term_ids.insert(text.clone(), id);
        terms.push(Term { text, id, postings });
    }

    let total_len: u64 = documents
        .par_iter()
        .filter(|d| !d.deleted)
        .map(|d| tokenizer.tokenize_for_index(d.text()).len() as u64)
        .sum();
    let doc_count = documents.iter().filter(|d| !d.deleted).count() as u32;
    let avg_doc_len = if doc_count > 0 {
        total_len as f64 / doc_count as f64
    } else {
        0.0
    };

    let texts: Vec<String> = terms.iter().map(|t| t.text.clone()).collect();
    let prefix = PrefixIndex::build(&texts);

    InvertedIndex {
        term_ids,
        terms,
        prefix,
        documents,
        stats: CorpusStats {
            doc_count,
            avg_doc_len,
        },
    }
}

/// Assigns dense internal ids to a batch of documents, preserving segment-0-
/// first ordering within each external key's run of segments.
pub fn assign_internal_ids(mut documents: Vec<Document>) -> Vec<Document> {
    documents.sort_by_key(|d| (d.key, d.segment));
    for (i, doc) in documents.iter_mut().enumerate() {
        doc.internal_id = InternalId::new(i as u32);
    }
    documents
}
