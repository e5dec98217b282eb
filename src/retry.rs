// Copyright (C) 2026 vipr contributors
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use tracing::warn;

use super::error::*;

/// Something holding a session that can be thrown away and replaced by a
/// fresh login.
pub trait Reauthenticate {
    /// Drop the current session and log in again.
    fn reauthenticate(&mut self) -> Result<()>;
}

/// Run `op`, logging in again and retrying it once if it failed because the
/// session was rejected.
///
/// Only errors for which [`ViprError::is_auth_failure()`][1] holds are
/// retried. Other errors, a failed re-login and a failed retry are returned
/// as they are. `op` therefore runs at most twice and `reauthenticate` at
/// most once.
///
/// [1]: enum.ViprError.html#method.is_auth_failure
pub fn with_auth_retry<C, T, F>(ctx: &mut C, mut op: F) -> Result<T>
where
    C: Reauthenticate + ?Sized,
    F: FnMut(&mut C) -> Result<T>,
{
    match op(ctx) {
        Ok(v) => return Ok(v),
        Err(e) => {
            if !e.is_auth_failure() {
                return Err(e);
            }
            warn!("Session rejected by controller ({}), logging in again", e);
        }
    }
    ctx.reauthenticate()?;
    op(ctx)
}
