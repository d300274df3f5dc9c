// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tokens command: shows how the lexer splits a template.

use super::read_template;
use crate::config::Config;

/// Formats the token stream of `source`, one token per line.
pub fn dump(config: &Config, source: &str) -> String {
    config
        .parser()
        .tokenize(source)
        .map(|token| format!("{:>4} {:<10} {:?}\n", token.line, token.kind.to_string(), token.content))
        .collect()
}

/// Runs the tokens command.
pub fn run(config: &Config, name: &str) -> anyhow::Result<()> {
    let source = read_template(&config.sources(), name)?;
    print!("{}", dump(config, &source));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump() {
        let out = dump(&Config::default(), "a\n{{ b }}{# c #}{% if d %}");
        assert_eq!(
            out,
            "   1 text       \"a\\n\"\n   2 expression \"b\"\n   2 block      \"if d\"\n"
        );
    }
}
