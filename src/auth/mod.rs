/*!
 * # Authorization Module
 *
 * Role/permission evaluation for platform and factory users:
 *
 * - role metadata and the platform/factory permission matrices (`rbac`)
 * - the permission resolver deriving facts from a user snapshot (`resolver`)
 * - declarative guards and their composition (`guard`)
 * - the loading-aware decision adapter (`decision`)
 */

mod decision;
mod guard;
mod permissions;
mod rbac;
mod resolver;
mod types;

pub use decision::*;
pub use guard::*;
pub use permissions::*;
pub use rbac::*;
pub use resolver::*;
pub use types::*;
