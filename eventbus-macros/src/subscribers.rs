use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, Expr, FnArg, ImplItem, ImplItemFn, Item, ItemImpl, LitStr, Member, Meta, Result,
    Token, Type, parse::Parse, parse::ParseStream, parse_macro_input,
};

/// #[subscribers] 宏实现
/// - 收集 `impl` 块中标注 `#[subscribe(..)]` 的方法，移除该标注
/// - 为 Self 生成 `::eventbus::Listener` 实现
/// - 参数：`#[subscribers(extends(field, ..))]`，继承内嵌字段类型的全部订阅方法
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as SubscribersAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut item_impl = match input {
        Item::Impl(i) if i.trait_.is_none() => i,
        other => {
            return syn::Error::new(other.span(), "#[subscribers] only on inherent impl block")
                .to_compile_error()
                .into();
        }
    };

    match expand_impl(&cfg, &mut item_impl) {
        Ok(listener_impl) => TokenStream::from(quote! {
            #item_impl
            #listener_impl
        }),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_impl(cfg: &SubscribersAttrConfig, item_impl: &mut ItemImpl) -> Result<TokenStream2> {
    let mut own: Vec<TokenStream2> = Vec::new();
    let mut errors: Option<syn::Error> = None;

    for item in item_impl.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };

        let Some(pos) = method
            .attrs
            .iter()
            .position(|a| a.path().is_ident("subscribe"))
        else {
            continue;
        };
        let attr = method.attrs.remove(pos);

        match subscribe_method(&attr, method) {
            Ok(tokens) => own.push(tokens),
            Err(e) => match errors.as_mut() {
                Some(all) => all.combine(e),
                None => errors = Some(e),
            },
        }
    }

    if let Some(e) = errors {
        return Err(e);
    }

    // 自身声明的方法在前：同名同事件的继承方法会在发现阶段被遮蔽
    let inherited = cfg.extends.iter().map(|field| {
        quote! {
            methods.extend(::eventbus::SubscribeMethod::inherit::<Self, _, _>(
                |listener: &Self| &listener.#field,
            )?);
        }
    });

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::eventbus::Listener for #self_ty #where_clause {
            fn subscribe_methods(
            ) -> ::eventbus::BusResult<::std::vec::Vec<::eventbus::SubscribeMethod>> {
                #[allow(unused_mut)]
                let mut methods: ::std::vec::Vec<::eventbus::SubscribeMethod> =
                    ::std::vec![#(#own),*];
                #(#inherited)*
                ::std::result::Result::Ok(methods)
            }
        }
    })
}

// 生成单个订阅方法的描述构建表达式
fn subscribe_method(attr: &Attribute, method: &ImplItemFn) -> Result<TokenStream2> {
    let opts = SubscribeOptions::from_attr(attr)?;
    let sig = &method.sig;
    let ident = &sig.ident;

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "subscriber method must not be async",
        ));
    }

    match sig.receiver() {
        Some(recv) if recv.reference.is_some() && recv.mutability.is_none() => {}
        Some(recv) => {
            let span = recv.mutability.map_or(recv.self_token.span, |m| m.span);
            return Err(syn::Error::new(
                span,
                "subscriber method must take `&self`",
            ));
        }
        None => {
            return Err(syn::Error::new(
                ident.span(),
                "subscriber method must take `&self`",
            ));
        }
    }

    let params: Vec<&syn::PatType> = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pt) => Some(pt),
            FnArg::Receiver(_) => None,
        })
        .collect();

    if params.len() != 1 {
        return Err(syn::Error::new(
            ident.span(),
            format!(
                "subscriber method `{}` must declare exactly 1 parameter, found {}",
                ident,
                params.len()
            ),
        ));
    }

    let event_ty = match params[0].ty.as_ref() {
        Type::Reference(r) if r.mutability.is_none() => &r.elem,
        other => {
            return Err(syn::Error::new(
                other.span(),
                "subscriber parameter must be a shared reference to the event, e.g. `&MyEvent`",
            ));
        }
    };

    let name = ident.to_string();
    let mut built = quote! {
        ::eventbus::SubscribeMethod::new::<Self, #event_ty, _, _>(
            #name,
            |listener: &Self, event: &#event_ty| listener.#ident(event),
        )
    };
    if let Some(priority) = &opts.priority {
        built = quote! { #built.with_priority(#priority) };
    }
    if let Some(label) = &opts.label {
        built = quote! { #built.with_label(#label) };
    }
    if opts.concurrent {
        built = quote! { #built.concurrent() };
    }
    Ok(built)
}

// -------- parsing --------

struct SubscribersAttrConfig {
    extends: Vec<Member>,
}

impl Parse for SubscribersAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self {
                extends: Vec::new(),
            });
        }

        let key: syn::Ident = input.parse()?;
        if key != "extends" {
            return Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'extends'",
            ));
        }

        let content;
        syn::parenthesized!(content in input);
        let fields: Punctuated<Member, Token![,]> = Punctuated::parse_terminated(&content)?;
        if fields.is_empty() {
            return Err(syn::Error::new(
                key.span(),
                "'extends' expects at least one field",
            ));
        }
        if !input.is_empty() {
            return Err(input.error("unexpected tokens after 'extends(..)'"));
        }

        Ok(Self {
            extends: fields.into_iter().collect(),
        })
    }
}

#[derive(Default)]
struct SubscribeOptions {
    priority: Option<Expr>,
    label: Option<LitStr>,
    concurrent: bool,
}

impl SubscribeOptions {
    // 支持：#[subscribe] / #[subscribe(priority = expr, label = "..", concurrent)]
    fn from_attr(attr: &Attribute) -> Result<Self> {
        let mut opts = Self::default();
        if matches!(attr.meta, Meta::Path(_)) {
            return Ok(opts);
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("priority") {
                if opts.priority.is_some() {
                    return Err(meta.error("duplicate key 'priority' in attribute"));
                }
                opts.priority = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("label") {
                if opts.label.is_some() {
                    return Err(meta.error("duplicate key 'label' in attribute"));
                }
                opts.label = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("concurrent") {
                opts.concurrent = true;
            } else {
                return Err(meta.error(
                    "unknown key in attribute; expected 'priority', 'label' or 'concurrent'",
                ));
            }
            Ok(())
        })?;
        Ok(opts)
    }
}
