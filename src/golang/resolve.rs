//! Matching diff-level function identities to program declarations

use super::program::{FuncId, Program};
use crate::impact::{file_matches, to_slash};
use crate::types::ModifiedFunction;

/// First declaration (in program order) matching `function`.
///
/// The name must be equal. A receiver, when given, must name the
/// declaration's receiver type; `*T`, `pkg.T` and `T[K]` spellings are
/// accepted for either pointer or value receivers. Without a receiver,
/// methods of that name match too. The declaring file must satisfy the
/// lenient `file_matches` rule against the relative or absolute path.
pub fn find_function(program: &Program, function: &ModifiedFunction) -> Option<FuncId> {
    let receiver = function.receiver().map(receiver_type_name);

    program.funcs.iter().enumerate().find_map(|(id, decl)| {
        if decl.name != function.name {
            return None;
        }
        if let Some(expected) = receiver {
            match &decl.receiver {
                Some(recv) if recv.type_name == expected => {}
                _ => return None,
            }
        }
        if function.file.is_empty() {
            return Some(id);
        }
        let file = program.file_of(id);
        let matched = file_matches(&file.rel_path, &function.file)
            || file_matches(&to_slash(&file.abs_path), &function.file);
        matched.then_some(id)
    })
}

/// `*pkg.Type[K]` -> `Type`
fn receiver_type_name(receiver: &str) -> &str {
    let name = receiver.trim().trim_start_matches('(').trim_end_matches(')');
    let name = name.trim_start_matches('*');
    let name = name.rsplit('.').next().unwrap_or(name);
    name.split('[').next().unwrap_or(name)
}
