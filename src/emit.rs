//! Registration wrapper emission.
//!
//! Output is produced by splicing the original source: every worklet region is
//! replaced with a self-invoking wrapper that builds the function value,
//! attaches its metadata, hands it to the registration hook and evaluates to
//! it. Code outside worklet regions is untouched byte for byte.

use oxc_span::Span;
use std::collections::HashSet;

use crate::capture::CaptureTrie;
use crate::classify::{Placement, WorkletSite};
use crate::tables::{CLOSURE_PROPERTY, PRIVATE_FUNCTION};
use crate::validate::{CompilerError, ERR_REENTRANT};

#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub span: Span,
    pub text: String,
}

/// Text of `region` with `edits` applied. Edits outside the region, or
/// overlapping an edit already applied, are ignored.
pub fn splice(source: &str, region: Span, edits: &[Edit]) -> String {
    let mut edits: Vec<&Edit> = edits
        .iter()
        .filter(|e| e.span.start >= region.start && e.span.end <= region.end)
        .collect();
    edits.sort_by(|a, b| b.span.start.cmp(&a.span.start));

    let mut result = source[region.start as usize..region.end as usize].to_string();
    let mut floor = region.end;
    for edit in edits {
        if edit.span.end > floor {
            continue;
        }
        let start = (edit.span.start - region.start) as usize;
        let end = (edit.span.end - region.start) as usize;
        result.replace_range(start..end, &edit.text);
        floor = edit.span.start;
    }
    result
}

/// `_f`, or `_f1`, `_f2`, ... when a captured root already uses the name.
fn private_name(closure: &CaptureTrie) -> String {
    let roots = closure.roots();
    let mut name = PRIVATE_FUNCTION.to_string();
    let mut n = 1;
    while roots.contains(&name.as_str()) {
        name = format!("{}{}", PRIVATE_FUNCTION, n);
        n += 1;
    }
    name
}

fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| String::from("\"\""))
}

pub struct Emitter<'e> {
    source: &'e str,
    hook: &'e str,
    file_path: &'e str,
    sites: &'e [WorkletSite],
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    emitted: HashSet<u32>,
}

impl<'e> Emitter<'e> {
    pub fn new(source: &'e str, file_path: &'e str, hook: &'e str, sites: &'e [WorkletSite]) -> Self {
        let mut order: Vec<usize> = (0..sites.len()).collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (sites[a].region, sites[b].region);
            a.start.cmp(&b.start).then(b.end.cmp(&a.end))
        });

        let mut children = vec![Vec::new(); sites.len()];
        let mut roots = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        for index in order {
            let region = sites[index].region;
            while let Some(&top) = stack.last() {
                let outer = sites[top].region;
                if outer.start <= region.start && region.end <= outer.end {
                    break;
                }
                stack.pop();
            }
            match stack.last() {
                Some(&parent) => children[parent].push(index),
                None => roots.push(index),
            }
            stack.push(index);
        }

        Emitter {
            source,
            hook,
            file_path,
            sites,
            children,
            roots,
            emitted: HashSet::new(),
        }
    }

    /// The rewritten file.
    pub fn emit(mut self) -> Result<String, CompilerError> {
        let mut edits = Vec::with_capacity(self.roots.len());
        for index in self.roots.clone() {
            edits.push(self.render(index)?);
        }
        let whole = Span::new(0, self.source.len() as u32);
        Ok(splice(self.source, whole, &edits))
    }

    fn render(&mut self, index: usize) -> Result<Edit, CompilerError> {
        let sites = self.sites;
        let site = &sites[index];
        if !self.emitted.insert(site.node_span.start) {
            return Err(CompilerError::at_offset(
                ERR_REENTRANT,
                &format!("Worklet '{}' was emitted twice in one pass.", site.unit.name),
                self.file_path,
                self.source,
                site.node_span.start,
            ));
        }

        let mut edits: Vec<Edit> = site
            .unit
            .own_directives
            .iter()
            .map(|span| Edit {
                span: *span,
                text: String::new(),
            })
            .collect();
        for child in self.children[index].clone() {
            edits.push(self.render(child)?);
        }

        let function = format!(
            "{}{}",
            site.function_prefix,
            splice(self.source, site.function_region, &edits)
        );
        let wrapper = self.wrapper(site, &function);
        let text = match &site.placement {
            Placement::Declaration { name } => format!("const {} = {};", name, wrapper),
            Placement::Expression => wrapper,
            Placement::Method { key } => format!("{}: {}", key, wrapper),
        };
        Ok(Edit {
            span: site.region,
            text,
        })
    }

    fn wrapper(&self, site: &WorkletSite, function: &str) -> String {
        let unit = &site.unit;
        let f = &private_name(&unit.closure);
        let mut out = format!("(function () {{ const {} = {}; ", f, function);
        out.push_str(&format!(
            "{}.{} = {}; ",
            f,
            CLOSURE_PROPERTY,
            unit.closure.closure_source()
        ));
        out.push_str(&format!("{}.asString = {}; ", f, js_string(&unit.source_text)));
        out.push_str(&format!("{}.__workletHash = {}; ", f, unit.content_hash));
        out.push_str(&format!("{}.__location = {}; ", f, js_string(&unit.location)));
        if !unit.flags.is_empty() {
            out.push_str(&format!("{}.__optimization = {}; ", f, unit.flags.bits()));
        }
        out.push_str(&format!("{}({}); return {}; }})()", self.hook, f, f));
        out
    }
}
