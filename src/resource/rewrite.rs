//! Rewriting of resource references in the root HTML.

use std::collections::{HashMap, HashSet};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info};

use super::index::{is_cid, ResourceIndex};
use super::naming::FileNamer;
use super::scan::find_references;
use crate::model::output::{ConvertOptions, ExtractedFile, RewritePlan};
use crate::model::part::MimePart;

/// Rewritten HTML plus the side products of rewriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub html: String,
    /// Files referenced by the rewritten HTML, in first-reference order.
    pub extracted: Vec<ExtractedFile>,
    /// Resource references with no matching part, deduplicated.
    pub missing: Vec<String>,
}

/// Replace every resolvable reference in `html` according to `options`.
///
/// Each resource gets exactly one [`RewritePlan`] per run, no matter how
/// many times or under how many spellings it is referenced. Unresolved
/// references stay as written; those in resource-loading positions, and
/// every `cid:` reference, are reported as missing.
pub fn rewrite(html: &str, index: &ResourceIndex<'_>, options: &ConvertOptions) -> RewriteOutcome {
    if !options.process_images {
        debug!("Resource processing disabled, references left untouched");
        return RewriteOutcome {
            html: html.to_string(),
            ..Default::default()
        };
    }

    let mut rewriter = Rewriter::new(options);
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for found in find_references(html) {
        let span = found.span;
        let written = &html[span.clone()];
        let reference = unescape_reference(written);

        match index.resolve(&reference) {
            Some(hit) => {
                out.push_str(&html[last..span.start]);
                rewriter
                    .plan_for(hit.index, hit.part, &reference)
                    .write_replacement(&mut out);
                last = span.end;
            }
            None if found.loads_resource || is_cid(&reference) => {
                rewriter.report_missing(reference)
            }
            None => {}
        }
    }
    out.push_str(&html[last..]);

    info!(
        resources = rewriter.plans.len(),
        extracted = rewriter.extracted.len(),
        missing = rewriter.missing.len(),
        "Rewrote resource references"
    );

    RewriteOutcome {
        html: out,
        extracted: rewriter.extracted,
        missing: rewriter.missing,
    }
}

struct Rewriter<'o> {
    options: &'o ConvertOptions,
    /// Plans keyed by part position.
    plans: HashMap<usize, RewritePlan>,
    namer: FileNamer,
    extracted: Vec<ExtractedFile>,
    missing: Vec<String>,
    missing_seen: HashSet<String>,
}

impl<'o> Rewriter<'o> {
    fn new(options: &'o ConvertOptions) -> Self {
        Self {
            options,
            plans: HashMap::new(),
            namer: FileNamer::new(),
            extracted: Vec::new(),
            missing: Vec::new(),
            missing_seen: HashSet::new(),
        }
    }

    fn plan_for(&mut self, index: usize, part: &MimePart<'_>, reference: &str) -> &RewritePlan {
        if !self.plans.contains_key(&index) {
            let plan = self.make_plan(part, reference);
            self.plans.insert(index, plan);
        }
        &self.plans[&index]
    }

    fn make_plan(&mut self, part: &MimePart<'_>, reference: &str) -> RewritePlan {
        let embeddable = !part.is_multipart();
        let inline = embeddable && (self.options.embed_images || !part.is_image());

        if inline {
            debug!(
                reference,
                content_type = %part.content_type,
                bytes = part.decoded_body.len(),
                "Inlining resource"
            );
            return RewritePlan::InlineAsDataUri {
                mime_type: part.content_type.clone(),
                payload: STANDARD.encode(&part.decoded_body),
            };
        }

        let file_name = self.namer.name_for(part, reference);
        let dir = self.options.images_dir.trim_end_matches(['/', '\\']);
        let relative_path = if dir.is_empty() {
            file_name.clone()
        } else {
            format!("{dir}/{file_name}")
        };
        debug!(reference, path = %relative_path, "Extracting resource");

        self.extracted.push(ExtractedFile {
            file_name,
            relative_path: relative_path.clone(),
            content_type: part.content_type.clone(),
            reference: reference.to_string(),
            data: part.decoded_body.to_vec(),
        });
        RewritePlan::ExtractToFile { relative_path }
    }

    fn report_missing(&mut self, reference: String) {
        if self.missing_seen.insert(reference.clone()) {
            debug!(reference = %reference, "Unresolved resource reference");
            self.missing.push(reference);
        }
    }
}

/// Undo the character references that commonly appear inside URLs.
fn unescape_reference(written: &str) -> String {
    if !written.contains('&') {
        return written.to_string();
    }
    written
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#38;", "&")
        .replace("&amp;", "&")
}
