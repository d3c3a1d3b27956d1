/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

/// syntactic sugar macro to define thiserror Error enums:
/// ```ignore
/// define_error!{ pub NetError =
///   IOError( #[from] std::io::Error ) : "IO error: {0}",
///   OpFailed(String) : "operation failed: {0}"
/// }
/// ```
/// will get expanded into
/// ```ignore
/// #[derive(thiserror::Error,Debug)]
/// pub enum NetError {
///     #[error("IO error: {0}")]
///     IOError(#[from] std::io::Error),
///
///     #[error("operation failed: {0}")]
///     OpFailed(String),
/// }
/// ```
/// Variants can also be struct-like, in which case the message can refer to field names
#[macro_export]
macro_rules! define_error {
    ($vis:vis $name:ident = $( $err_variant:ident $( ( $( $( #[$meta:meta] )? $field_type:ty),* ) )? $( { $( $fname:ident : $ftype:ty ),* } )? : $msg_lit:literal ),* $(,)?) => {
        #[derive(thiserror::Error,Debug)]
        $vis enum $name {
            $(
                #[error($msg_lit)]
                $err_variant $( ( $( $(#[$meta])? $field_type ),*  ) )? $( { $( $fname : $ftype ),* } )?
            ),*
        }
    }
}

/// map an error type into an opaque (String based) variant of a thiserror enum
#[macro_export]
macro_rules! map_to_opaque_error {
    ($from_error:ty => $to_error:ident :: $variant:ident) => {
        impl From<$from_error> for $to_error {
            fn from (e: $from_error)->Self { $to_error :: $variant ( e.to_string()) }
        }
    };
}

/// syntactic sugar macro for clap based command line interface definitions
/// ```ignore
/// define_cli! { ARGS [about="my silly prog"] =
///   verbose: bool        [help="run verbose", short],
///   config: String       [help="pathname of config", long, default_value="blah"]
/// }
///
/// fn main () {
///    check_cli!(ARGS); // exit on -h or --help before doing anything else
///    ...
///    let config = &ARGS.config;
/// }
/// ```
/// expands into a `#[derive(clap::Parser)] struct CliOpts {..}` and a lazily parsed
/// `static ARGS: LazyLock<CliOpts>`. The using crate has to depend on clap with the "derive" feature
#[macro_export]
macro_rules! define_cli {
    ($name:ident [ $( $sopt:ident $(= $sx:expr)? ),* ] = $( $( #[$meta:meta] )? $fname:ident : $ftype:ty [ $( $fopt:ident $(= $fx:expr)?),* ] ),* $(,)? ) => {
        #[derive(clap::Parser,Debug)]
        #[command( $( $sopt $(=$sx)? ),* )]
        struct CliOpts {
            $(
                #[arg( $( $fopt $(=$fx)? ),* )]
                $(#[$meta])?
                $fname : $ftype,
            )*
        }

        static $name: std::sync::LazyLock<CliOpts> = std::sync::LazyLock::new( || <CliOpts as clap::Parser>::parse());
    }
}

/// force parsing of the command line arguments defined by [`define_cli`]
#[macro_export]
macro_rules! check_cli {
    ($name:ident) => {
        std::sync::LazyLock::force( &$name);
    }
}
