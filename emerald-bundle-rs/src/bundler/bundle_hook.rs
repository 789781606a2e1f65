//! `import.meta` rewriting for bundled modules.

use anyhow::Result;
use deno_ast::swc::ast::{
    Bool, Expr, KeyValueProp, Lit, MemberExpr, MemberProp, MetaPropExpr, MetaPropKind, PropName,
    Str,
};
use deno_ast::swc::bundler::{Hook, ModuleRecord};
use deno_ast::swc::common::Span;

/// Gives each inlined module an `import.meta` object of its own.
///
/// `url` is the module's original specifier, so remote modules keep reporting their
/// registry URL. `main` is only live for the entry module.
pub struct BundleHook;

fn meta_prop(key: &'static str, value: Expr) -> KeyValueProp {
    KeyValueProp {
        key: PropName::Ident(key.into()),
        value: Box::new(value),
    }
}

impl Hook for BundleHook {
    fn get_import_meta_props(
        &self,
        span: Span,
        module_record: &ModuleRecord,
    ) -> Result<Vec<KeyValueProp>> {
        let url = Expr::Lit(Lit::Str(Str {
            span,
            value: module_record.file_name.to_string().into(),
            raw: None,
        }));
        let main = if module_record.is_entry {
            Expr::Member(MemberExpr {
                span,
                obj: Box::new(Expr::MetaProp(MetaPropExpr {
                    span,
                    kind: MetaPropKind::ImportMeta,
                })),
                prop: MemberProp::Ident("main".into()),
            })
        } else {
            Expr::Lit(Lit::Bool(Bool { span, value: false }))
        };
        Ok(vec![meta_prop("url", url), meta_prop("main", main)])
    }
}
