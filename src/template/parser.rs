//! Reference grammar and substitution.
//!
//! A reference is `:` + optional `{TYPE(ARGS)}` + dotted path + `:`.
//! It starts at the beginning of the template or after any character other
//! than `:`, so `a::int` casts and back-to-back references such as
//! `:a::b:` (only `:a:` is a reference) are left alone.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::pipeline::context::{RequestContext, ResolveError};
use crate::template::{ParamMeta, QueryDescriptor};

// 1: preceding char (kept), 2: type, 3: parenthesised arguments,
// 4: argument list, 5: path
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(^|[^:]):(?:\{([A-Za-z0-9_]+)(\(\s*([0-9]+(?:\s*,\s*[0-9]+)*)?\s*\))?\})?([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*):",
    )
    .unwrap()
});

/// Errors raised while parsing a template against a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("type argument `{raw}` of `{ty}` is out of range")]
    TypeArgument { ty: String, raw: String },
}

/// Placeholder token for the 1-based position `index`.
pub fn placeholder(index: usize) -> String {
    format!("?v{}?", index)
}

/// Replace every reference in `template` with a placeholder and resolve its value.
pub fn parse(template: &str, cx: &RequestContext) -> Result<QueryDescriptor, TemplateError> {
    let mut descriptor = QueryDescriptor {
        text: String::with_capacity(template.len()),
        ..QueryDescriptor::default()
    };
    let mut last = 0;

    for caps in REFERENCE.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let path = caps.get(5).map_or("", |m| m.as_str());

        let value = cx.lookup(path)?;
        let meta = annotation(&caps)?;

        descriptor.text.push_str(&template[last..whole.start()]);
        descriptor.text.push_str(prefix);
        descriptor.values.push(value);
        descriptor.metadata.push(meta);
        descriptor.text.push_str(&placeholder(descriptor.values.len()));
        last = whole.end();
    }

    descriptor.text.push_str(&template[last..]);
    Ok(descriptor)
}

fn annotation(caps: &Captures<'_>) -> Result<ParamMeta, TemplateError> {
    let Some(ty) = caps.get(2).map(|m| m.as_str().to_string()) else {
        return Ok(ParamMeta::default());
    };

    // Parentheses without arguments still count as "arguments supplied".
    let has_parens = caps.get(3).is_some();
    let type_args = match caps.get(4) {
        Some(raw) => Some(
            raw.as_str()
                .split(',')
                .map(|arg| {
                    let arg = arg.trim();
                    arg.parse::<u32>().map_err(|_| TemplateError::TypeArgument {
                        ty: ty.clone(),
                        raw: arg.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None if has_parens => Some(Vec::new()),
        None => None,
    };

    Ok(ParamMeta {
        ty: Some(ty),
        type_args,
    })
}
