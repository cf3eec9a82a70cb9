// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#[cfg(feature = "tracing")]
pub use tracing::{debug, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop {
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }
    macro_rules! info {
        ($($arg:tt)*) => {};
    }
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }
    macro_rules! warn_disabled {
        ($($arg:tt)*) => {};
    }
    pub(crate) use debug;
    pub(crate) use info;
    pub(crate) use trace;
    pub(crate) use warn_disabled as warn;
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop::*;
