//! Offline utility: turns a `packets.json` report into a Rust `match`-based
//! packet-id-to-name lookup a maintainer can paste into a scratch module
//! when they want compile-time names instead of the runtime
//! `PacketNameRegistry`. Not part of the client's runtime path — run by
//! hand, output reviewed and discarded or copied manually.

use std::collections::HashMap;
use std::env;
use std::fs;

use heck::ToShoutySnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PacketEntry {
    protocol_id: i32,
}

type PacketDirectory = HashMap<String, HashMap<String, HashMap<String, PacketEntry>>>;

fn main() -> eyre::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("./data/packets.json");

    let text = fs::read_to_string(path)?;
    let directory: PacketDirectory = serde_json::from_str(&text)?;

    let mut modules = Vec::new();
    for (phase, by_direction) in &directory {
        for (direction, by_name) in by_direction {
            let mod_name = format_ident!(
                "{}_{}",
                phase.to_shouty_snake_case().to_lowercase(),
                direction.to_shouty_snake_case().to_lowercase()
            );
            let consts: Vec<TokenStream> = by_name
                .iter()
                .map(|(name, entry)| {
                    let const_name = format_ident!(
                        "{}",
                        name.rsplit_once(':')
                            .map_or(name.as_str(), |(_, n)| n)
                            .to_shouty_snake_case()
                    );
                    let id = entry.protocol_id;
                    quote! { pub const #const_name: i32 = #id; }
                })
                .collect();
            modules.push(quote! {
                pub mod #mod_name {
                    #(#consts)*
                }
            });
        }
    }

    let file: syn::File = syn::parse2(quote! { #(#modules)* })?;
    println!("{}", prettyplease::unparse(&file));
    Ok(())
}
