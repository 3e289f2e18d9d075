//! Positional argument marshalling.
//!
//! Calls carry their arguments as an ordered list of opaque values. On the
//! calling side a tuple is packed with [`IntoArguments`]; on the serving side
//! the list is unpacked back into a tuple with [`FromArguments`]. Both are
//! implemented for tuples of up to eight elements, including `()`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::{Fault, Result};

/// Packs a tuple of serializable values into an argument list.
pub trait IntoArguments {
    fn into_arguments(self) -> Result<Vec<Value>>;
}

/// Unpacks an argument list into a tuple of typed values.
///
/// An arity mismatch or a value of the wrong shape is reported as an
/// `InvalidArguments` fault.
pub trait FromArguments: Sized {
    fn from_arguments(arguments: Vec<Value>) -> std::result::Result<Self, Fault>;
}

impl IntoArguments for Vec<Value> {
    fn into_arguments(self) -> Result<Vec<Value>> {
        Ok(self)
    }
}

impl FromArguments for Vec<Value> {
    fn from_arguments(arguments: Vec<Value>) -> std::result::Result<Self, Fault> {
        Ok(arguments)
    }
}

macro_rules! tuple_arguments {
    ($len:expr; $($ty:ident $var:ident),*) => {
        impl<$($ty: Serialize),*> IntoArguments for ($($ty,)*) {
            fn into_arguments(self) -> Result<Vec<Value>> {
                let ($($var,)*) = self;
                Ok(vec![$(serde_json::to_value($var)?),*])
            }
        }

        impl<$($ty: DeserializeOwned),*> FromArguments for ($($ty,)*) {
            #[allow(unused_mut, unused_variables)]
            fn from_arguments(arguments: Vec<Value>) -> std::result::Result<Self, Fault> {
                if arguments.len() != $len {
                    return Err(Fault::invalid_arguments(format!(
                        "expected {} argument(s), got {}",
                        $len,
                        arguments.len()
                    )));
                }

                let mut values = arguments.into_iter().enumerate();
                Ok(($(
                    {
                        let (position, $var) = values.next().unwrap_or((0, Value::Null));
                        serde_json::from_value::<$ty>($var).map_err(|e| {
                            Fault::invalid_arguments(format!("argument {}: {}", position, e))
                        })?
                    },
                )*))
            }
        }
    };
}

tuple_arguments!(0;);
tuple_arguments!(1; A1 a1);
tuple_arguments!(2; A1 a1, A2 a2);
tuple_arguments!(3; A1 a1, A2 a2, A3 a3);
tuple_arguments!(4; A1 a1, A2 a2, A3 a3, A4 a4);
tuple_arguments!(5; A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
tuple_arguments!(6; A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
tuple_arguments!(7; A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
tuple_arguments!(8; A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
