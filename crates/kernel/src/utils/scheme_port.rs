macro_rules! scheme_port {
    ($($scheme: literal => $port: literal)*) => {
        /// Default port of a scheme.
        pub fn scheme_to_port(scheme: &str) -> Option<u16> {
            $(
                if scheme.eq_ignore_ascii_case($scheme) {
                    return Some($port);
                }
            )*
            None
        }
    };
}

scheme_port! {
    "http" => 80
    "https" => 443
}
