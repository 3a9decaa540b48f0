pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::{ErrorKind, Result};

    fn check_window(window_size: u64) -> Result<u64> {
        verify_arg!(window_size, window_size > 0);
        Ok(window_size)
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(check_window(8).unwrap(), 8);
        let err = check_window(0).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "window_size");
                assert_eq!(message, "window_size > 0");
            }
            kind => panic!("unexpected error kind {kind:?}"),
        }
    }
}
