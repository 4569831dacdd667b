// src/core/chains/keyer.rs
//! Canonical identity keys shared by declarations and call sites.
//!
//! A method `M` on type `T` keys as `T.M` whether `T` was written as a
//! pointer, a qualified name or a generic instantiation; a free function keys
//! as its bare name. Declarations and calls must agree on this string, since
//! it is the only thing that links a call site to its callee.

use crate::core::model::{Callee, CallSite, FunctionDecl, TypeExpr};

/// Bare type name used to qualify method keys.
///
/// Strips one level of indirection and drops package qualification; anything
/// that is not a named type has no name.
pub fn receiver_type_name(ty: &TypeExpr) -> Option<&str> {
    let ty = match ty {
        TypeExpr::Pointer(inner) => inner.as_ref(),
        other => other,
    };

    match ty {
        TypeExpr::Named { name, .. } => Some(name.as_str()),
        _ => None,
    }
}

pub fn decl_key(decl: &FunctionDecl) -> String {
    match decl.receiver.as_ref().and_then(receiver_type_name) {
        Some(owner) => format!("{}.{}", owner, decl.name),
        None => decl.name.clone(),
    }
}

/// Key of the function a call targets, or `None` when it cannot be resolved
pub fn call_key(call: &CallSite) -> Option<String> {
    match &call.callee {
        Callee::Function(name) => Some(name.clone()),
        Callee::Method { receiver, name } => {
            let owner = receiver.as_ref().and_then(receiver_type_name)?;
            Some(format!("{}.{}", owner, name))
        }
        Callee::Unresolved => None,
    }
}
