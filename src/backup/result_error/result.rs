use crate::backup::result_error::error::Error;
use crate::backup::result_error::{AddFunctionName, AddMsg};

pub type Result<T> = std::result::Result<T, Error>;

impl<S: Into<String>, R> AddFunctionName<S> for Result<R> {
    fn add_fn_name(self, fn_name: S) -> Self {
        self.map_err(|e| e.add_fn_name(fn_name))
    }
}

impl<R, S: Into<String>> AddMsg<S> for Result<R> {
    fn add_msg(self, msg: S) -> Self {
        self.map_err(|e| e.add_msg(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_add_fn_name_wraps_err() {
        let err: Result<()> = Err(Error::parse_error("df", "no row"));
        match err.add_fn_name("volume::free_space") {
            Err(Error::WithFnName { fn_name, error }) => {
                assert_eq!(fn_name, "volume::free_space");
                assert!(matches!(*error, Error::ParseError { .. }));
            }
            other => panic!("Expected WithFnName, got {other:?}"),
        }
    }

    #[test]
    fn test_result_add_msg_only_touches_err() {
        let ok: Result<u8> = Ok(1);
        assert_eq!(ok.add_msg("unused").unwrap(), 1);

        let err: Result<u8> = Err(Error::parse_error("du", "empty"));
        match err.add_msg("Estimating size") {
            Err(Error::WithMsg { msg, .. }) => assert_eq!(msg, "Estimating size"),
            other => panic!("Expected WithMsg, got {other:?}"),
        }
    }
}
