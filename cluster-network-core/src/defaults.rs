use crate::{
    plugins::descriptor,
    resources::crd::v1::network::{NetworkSpec, ProxyConfig},
};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

impl NetworkSpec {
    /// Returns a copy with every unset optional field populated. Explicitly set
    /// values are never overwritten, so applying this twice changes nothing.
    pub fn defaulted(&self) -> NetworkSpec {
        let mut spec = self.clone();

        let proxy = spec.kube_proxy_config.get_or_insert_with(ProxyConfig::default);
        if proxy.bind_address.as_deref().map_or(true, str::is_empty) {
            proxy.bind_address = Some(DEFAULT_BIND_ADDRESS.to_owned());
        }

        // an unregistered plugin is left as is and reported by validation
        if let Some(descriptor) = descriptor(spec.default_network.plugin_type()) {
            spec.deploy_kube_proxy
                .get_or_insert(!descriptor.integrated_proxy);
            (descriptor.fill_defaults)(&mut spec.default_network);
        }

        spec
    }

    /// Address the service proxy binds to, falling back to the wildcard
    /// address when unset or empty.
    pub fn proxy_bind_address(&self) -> &str {
        self.kube_proxy_config
            .as_ref()
            .and_then(|proxy| proxy.bind_address.as_deref())
            .filter(|address| !address.is_empty())
            .unwrap_or(DEFAULT_BIND_ADDRESS)
    }
}

#[cfg(test)]
mod tests {
    use crate::resources::crd::v1::network::{
        ClusterNetworkEntry, DefaultNetworkDefinition, OpenShiftSdnConfig, OvnKubernetesConfig,
    };

    use super::*;

    fn spec(default_network: DefaultNetworkDefinition) -> NetworkSpec {
        NetworkSpec {
            cluster_networks: vec![ClusterNetworkEntry {
                cidr: "10.128.0.0/14".parse().unwrap(),
                host_subnet_length: 9,
            }],
            service_network: "172.30.0.0/16".parse().unwrap(),
            default_network,
            deploy_kube_proxy: None,
            kube_proxy_config: None,
        }
    }

    #[test]
    fn ovn_kubernetes_defaults() {
        let defaulted =
            spec(DefaultNetworkDefinition::ovn_kubernetes(OvnKubernetesConfig::default()))
                .defaulted();

        assert_eq!(
            defaulted.default_network,
            DefaultNetworkDefinition::ovn_kubernetes(OvnKubernetesConfig {
                geneve_port: Some(6081),
                mtu: Some(1400),
            })
        );
        assert_eq!(defaulted.deploy_kube_proxy, Some(false));
        assert_eq!(
            defaulted.kube_proxy_config.unwrap().bind_address.as_deref(),
            Some("0.0.0.0")
        );
    }

    #[test]
    fn defaults_never_overwrite_explicit_values() {
        let mut original = spec(DefaultNetworkDefinition::ovn_kubernetes(OvnKubernetesConfig {
            geneve_port: Some(9000),
            mtu: Some(9000),
        }));
        original.deploy_kube_proxy = Some(true);
        original.kube_proxy_config = Some(ProxyConfig {
            bind_address: Some("10.0.0.1".to_owned()),
            iptables_sync_period: Some("30s".to_owned()),
            proxy_arguments: None,
        });

        assert_eq!(original.defaulted(), original);
    }

    #[test]
    fn empty_bind_address_is_treated_as_unset() {
        let mut original = spec(DefaultNetworkDefinition::openshift_sdn(OpenShiftSdnConfig::default()));
        original.kube_proxy_config = Some(ProxyConfig {
            bind_address: Some(String::new()),
            ..Default::default()
        });

        let defaulted = original.defaulted();

        assert_eq!(
            defaulted.kube_proxy_config.unwrap().bind_address.as_deref(),
            Some(DEFAULT_BIND_ADDRESS)
        );
    }

    #[test]
    fn defaulting_is_idempotent() {
        let samples = [
            spec(DefaultNetworkDefinition::ovn_kubernetes(OvnKubernetesConfig::default())),
            spec(DefaultNetworkDefinition::openshift_sdn(OpenShiftSdnConfig::default())),
            spec(DefaultNetworkDefinition::OvnKubernetes {
                ovn_kubernetes_config: None,
            }),
        ];

        for sample in samples {
            let once = sample.defaulted();

            assert_eq!(once.defaulted(), once);
        }
    }

    #[test]
    fn missing_plugin_block_is_left_missing() {
        let defaulted = spec(DefaultNetworkDefinition::OvnKubernetes {
            ovn_kubernetes_config: None,
        })
        .defaulted();

        assert_eq!(
            defaulted.default_network,
            DefaultNetworkDefinition::OvnKubernetes {
                ovn_kubernetes_config: None
            }
        );
    }
}
